//! Shared UI icons.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "");
pub static HINT: Emoji<'_, '_> = Emoji("💡 ", "hint: ");
