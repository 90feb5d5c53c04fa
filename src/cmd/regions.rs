//! Region table listing — `launch-deploy regions`.

use std::process::ExitCode;

use console::style;
use launch_deploy::region::region_table;

pub fn cmd_regions() -> ExitCode {
    println!();
    println!(
        "{:<10} {:<32} {}",
        style("REGION").bold(),
        style("AUTH HOST").bold(),
        style("LAUNCH API HOST").bold()
    );
    for (key, auth, launch) in region_table() {
        println!("{:<10} {:<32} {}", key, auth, launch);
    }
    println!();
    println!("Set CONTENTSTACK_REGION to one of the keys above.");
    ExitCode::SUCCESS
}
