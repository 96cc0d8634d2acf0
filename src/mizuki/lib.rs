pub mod args;
pub mod editor;
pub mod errors;
pub mod field;
pub mod profile;
pub mod resolve;
pub mod store;
pub mod utils;

use std::path::Path;

use chrono::Local;
use clap::Parser;
use log::debug;

use args::{Cli, Commands};
use editor::{account_header, effective_json, print_rows, rows, set_field, set_override, target};
use errors::Result;
use field::parse_switch;
use resolve::{Role, View};
use store::{ensure_folder, PrefsFile, ProfileStore};
use utils::{find_store_folder, get_password, get_yn_input, istty, pretty_line};

pub fn run() -> Result<()> {
    execute(Cli::parse())
}

/// asks before the store folder is created for the first time
fn prepare_folder(folder: &Path, yes: bool) -> Result<()> {
    if !folder.exists() && !yes {
        let message = format!("{} doesn't exist, would you like to create it?\n", folder.display());
        if !get_yn_input(&message)? {
            return Err("ok bye ♥".into());
        }
    }
    ensure_folder(folder)
}

pub fn execute(cli: Cli) -> Result<()> {
    let folder = find_store_folder(&cli.store)?;
    debug!("using store folder {}", folder.display());
    let mut store = ProfileStore::restore(PrefsFile::in_folder(&folder));
    let tty = istty();
    let today = Local::now().date_naive();

    let command = cli.command.unwrap_or(Commands::List { brief: false });
    let mutates = !matches!(command,
                            Commands::List { .. }
                            | Commands::Show { .. }
                            | Commands::Export { .. }
                            | Commands::Fields
                            | Commands::Guide);
    if mutates {
        prepare_folder(&folder, cli.yes)?;
    }

    match command {
        Commands::List { brief } => {
            let base = store.base();
            let over = store.override_profile();
            pretty_line("base      ", &format!("{}\n", base.note), tty)?;
            pretty_line("override  ", &format!("{}\n", over.note), tty)?;
            for (n, profile) in store.list().iter().enumerate().skip(2) {
                let (note, line) = account_header(profile);
                pretty_line(&format!("\n{:<3} {}\n", n - 1, note), &format!("    {}\n", line), tty)?;
                if !brief {
                    let rows = rows(profile, Role::Account, &base, &over, View::Lite, today);
                    print_rows(&rows, View::Lite, tty)?;
                }
            }
            if store.account_count() == 0 {
                println!("\nno accounts yet, add one with `mizuki add`");
            }
        }
        Commands::Show { profile, lite, json } => {
            let (id, role) = target(&store, &profile)?;
            let base = store.base();
            let over = store.override_profile();
            let current = match store.get(&id) {
                Some(p) => p,
                None => return Err(format!("profile '{}' doesn't exist", profile).into()),
            };
            if json {
                let value = effective_json(current, role, &base, &over);
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                let view = if lite { View::Lite } else { View::Full };
                pretty_line(&format!("{}\n", current.note), &format!("id: {}\n", current.id), tty)?;
                print_rows(&rows(current, role, &base, &over, view, today), view, tty)?;
            }
        }
        Commands::Add => {
            let count = store.add_account()?;
            println!("accounts: {}", count);
        }
        Commands::Set { profile, field, value } => {
            set_field(&mut store, &profile, &field, &value)?;
            println!("set {} on '{}'", field, profile);
        }
        Commands::Override { profile, field, state } => {
            let on = match parse_switch(&state) {
                Some(on) => on,
                None => return Err(format!("expected on or off, got '{}'", state).into()),
            };
            set_override(&mut store, &profile, &field, on)?;
            println!("override of {} on '{}' is {}", field, profile, if on { "on" } else { "off" });
        }
        Commands::Pick { profile, field, indices } => {
            let stored = editor::pick_choices(&mut store, &profile, &field, &indices)?;
            println!("set {} on '{}' to [{}]", field, profile, stored);
        }
        Commands::Login { profile, username } => {
            target(&store, &profile)?;
            let password = get_password()?;
            editor::set_login(&mut store, &profile, username.as_deref(), &password)?;
            println!("updated login of '{}'", profile);
        }
        Commands::Server { profile } => {
            let (id, role) = target(&store, &profile)?;
            if role != Role::Account {
                return Err("only account profiles have a server".into());
            }
            store.update(&id, |p| {
                let mut next = p.clone();
                next.toggle_server();
                next
            })?;
            if let Some(p) = store.get(&id) {
                println!("'{}' now uses {}", profile, p.server);
            }
        }
        Commands::Verify { profile } => {
            set_field(&mut store, &profile, "evaluating", "on")?;
            println!("credentials of '{}' queued for verification", profile);
        }
        Commands::Import { file } => {
            let ok = store.import_file(&file)?;
            println!("import {}", if ok { "succeeded" } else { "failed" });
        }
        Commands::Export { file } => {
            let ok = store.export_file(&file);
            println!("export {}", if ok { "succeeded" } else { "failed" });
        }
        Commands::Fields => editor::print_fields(tty)?,
        Commands::Guide => editor::print_guide(tty)?,
    }

    Ok(())
}
