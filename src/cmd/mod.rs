//! CLI command implementations.
//!
//! | Module    | Commands handled          |
//! |-----------|---------------------------|
//! | `deploy`  | `Deploy` (the default)    |
//! | `regions` | `Regions`                 |

pub mod deploy;
pub mod regions;

pub use deploy::cmd_deploy;
pub use regions::cmd_regions;
