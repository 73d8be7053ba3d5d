//! CLI Adapter
//!
//! Command-line interface of the trader, built with clap derive macros.

mod commands;

pub use commands::{
    CliApp, Command, ConfigArg, ConfigArgOpt, SellAllCmd, SettingsCmd, SettingsSetCmd, WrapCmd,
};
