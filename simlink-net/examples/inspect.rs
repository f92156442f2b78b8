//! This example connects to a running server, prints the top of its
//! settings tree and the fields it can export.
//!
//! Usage: `inspect <server_info_file> [journal_file] [--verbose]`

extern crate simlink_net;
extern crate simplelog;

use std::env;
use std::path::PathBuf;

use simplelog::{Config, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use simlink_net::ClientConfig;

fn main() {
    let args: Vec<String> = env::args().collect();
    let be_verbose = args.contains(&"--verbose".to_string());
    if be_verbose {
        TermLogger::init(LevelFilter::Trace, Config::default(), TerminalMode::Mixed).unwrap();
    } else {
        let config = ConfigBuilder::new()
            .add_filter_allow_str("simlink_net")
            .build();
        TermLogger::init(LevelFilter::Info, config, TerminalMode::Mixed).unwrap();
    }

    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();
    let server_info = match positional.get(0) {
        Some(p) => PathBuf::from(p),
        None => {
            println!("Please provide a path to the server info file");
            return;
        }
    };
    let config = ClientConfig {
        journal: positional.get(1).map(PathBuf::from),
        ..ClientConfig::default()
    };

    let mut session = match simlink_net::connect(&server_info, config) {
        Ok(s) => s,
        Err(e) => {
            println!("Failed connecting: {}", e);
            return;
        }
    };

    match session.root().child_names() {
        Ok(names) => {
            for name in names {
                let help = session
                    .root()
                    .child(&name)
                    .and_then(|node| Ok(node.help()?.to_string()))
                    .unwrap_or_default();
                println!("{:<24} {}", name, help);
            }
        }
        Err(e) => println!("Failed listing the settings tree: {}", e),
    }

    let info = session.field_info();
    match info.get_fields_info() {
        Ok(fields) => {
            for (name, field) in fields {
                println!("scalar field: {} ({})", name, field.solver_name);
            }
        }
        Err(e) => println!("Failed reading field info: {}", e),
    }
    match info.get_surfaces_info() {
        Ok(surfaces) => {
            for (name, surface) in surfaces {
                println!("surface: {} {:?}", name, surface.surface_ids);
            }
        }
        Err(e) => println!("Failed reading surfaces info: {}", e),
    }

    if let Err(e) = session.exit() {
        println!("Failed closing the session: {}", e);
    }
}
