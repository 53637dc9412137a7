use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;

use adbsync::config::Config;
use adbsync::error::SyncError;
use adbsync::logging::*;
use adbsync::types::Direction;
use adbsync::{sync, utils};

fn cli() -> Command {
	Command::new("adbsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Synchronize files between a computer and an Android device")
		.subcommand_required(true)
		.arg_required_else_help(true)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::Count)
				.global(true)
				.conflicts_with("quiet")
				.help("More output (-vv for trace)"),
		)
		.arg(
			Arg::new("quiet")
				.short('q')
				.long("quiet")
				.action(ArgAction::Count)
				.global(true)
				.help("Less output (up to -qqq)"),
		)
		.arg(
			Arg::new("config")
				.long("config")
				.value_name("FILE")
				.value_parser(value_parser!(PathBuf))
				.global(true)
				.help("Configuration file (default: ~/.config/adbsync/config.toml)"),
		)
		.arg(
			Arg::new("dry-run")
				.short('n')
				.long("dry-run")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Show the plan without applying it"),
		)
		.arg(
			Arg::new("show-tree")
				.long("show-tree")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Print the source and destination trees with the plan, without applying it"),
		)
		.arg(
			Arg::new("json")
				.long("json")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Print the plan as JSON"),
		)
		.arg(
			Arg::new("copy-to-new-folder")
				.long("copy-to-new-folder")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Copy changed files into DEST_YYYY_MM_DD instead of updating an existing DEST"),
		)
		.arg(
			Arg::new("del")
				.long("del")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Delete destination files that are missing from the source"),
		)
		.arg(
			Arg::new("delete-excluded")
				.long("delete-excluded")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Delete excluded files from the destination"),
		)
		.arg(
			Arg::new("force")
				.long("force")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Allow replacing files with directories and directories with files"),
		)
		.arg(
			Arg::new("copy-links")
				.short('L')
				.long("copy-links")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Follow symlinks instead of skipping them"),
		)
		.arg(
			Arg::new("exclude")
				.long("exclude")
				.value_name("PATTERN")
				.action(ArgAction::Append)
				.global(true)
				.help("Exclude paths matching PATTERN (repeatable)"),
		)
		.arg(
			Arg::new("exclude-from")
				.long("exclude-from")
				.value_name("FILE")
				.value_parser(value_parser!(PathBuf))
				.action(ArgAction::Append)
				.global(true)
				.help("Read exclude patterns from FILE (repeatable)"),
		)
		.arg(
			Arg::new("ignore-case")
				.long("ignore-case")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Match exclude patterns case-insensitively"),
		)
		.arg(
			Arg::new("mtime-tolerance")
				.long("mtime-tolerance")
				.value_name("SECONDS")
				.value_parser(value_parser!(u64))
				.global(true)
				.help("Treat modification times this close as equal"),
		)
		.arg(
			Arg::new("adb-bin")
				.long("adb-bin")
				.value_name("PATH")
				.global(true)
				.help("adb executable (default: adb)"),
		)
		.arg(
			Arg::new("adb-flag")
				.long("adb-flag")
				.value_name("FLAG")
				.action(ArgAction::Append)
				.global(true)
				.help("Pass -FLAG to adb, e.g. d for adb -d (repeatable)"),
		)
		.arg(
			Arg::new("adb-option")
				.long("adb-option")
				.value_names(["OPTION", "VALUE"])
				.num_args(2)
				.action(ArgAction::Append)
				.global(true)
				.help("Pass -OPTION VALUE to adb, e.g. P 5037 (repeatable)"),
		)
		.subcommand(
			Command::new("push")
				.about("Copy from the computer to the device")
				.arg(Arg::new("local").value_name("LOCAL").required(true))
				.arg(Arg::new("device").value_name("DEVICE").required(true)),
		)
		.subcommand(
			Command::new("pull")
				.about("Copy from the device to the computer")
				.arg(Arg::new("device").value_name("DEVICE").required(true))
				.arg(Arg::new("local").value_name("LOCAL").required(true)),
		)
}

/// Config file overlaid with the command line
fn load_config(matches: &ArgMatches) -> Result<Config, SyncError> {
	let mut config = Config::load(matches.get_one::<PathBuf>("config").map(|p| p.as_path()))?;

	let flag = |name: &str| matches.get_flag(name);
	config.dry_run |= flag("dry-run");
	config.show_tree |= flag("show-tree");
	config.json |= flag("json");
	config.delete |= flag("del");
	config.delete_excluded |= flag("delete-excluded");
	config.force |= flag("force");
	config.copy_links |= flag("copy-links");
	config.copy_to_new_folder |= flag("copy-to-new-folder");
	config.case_insensitive |= flag("ignore-case");

	if let Some(patterns) = matches.get_many::<String>("exclude") {
		config.exclude_patterns.extend(patterns.cloned());
	}
	if let Some(files) = matches.get_many::<PathBuf>("exclude-from") {
		config.exclude_from.extend(files.cloned());
	}
	if let Some(secs) = matches.get_one::<u64>("mtime-tolerance") {
		config.mtime_tolerance_secs = Some(*secs);
	}
	if let Some(bin) = matches.get_one::<String>("adb-bin") {
		config.adb.bin = bin.clone();
	}
	if let Some(flags) = matches.get_many::<String>("adb-flag") {
		config.adb.flags.extend(flags.cloned());
	}
	if let Some(occurrences) = matches.get_occurrences::<String>("adb-option") {
		for mut values in occurrences {
			if let (Some(option), Some(value)) = (values.next(), values.next()) {
				config.adb.options.push((option.clone(), value.clone()));
			}
		}
	}

	Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let matches = cli().get_matches();
	let (direction, sub) = match matches.subcommand() {
		Some(("push", sub)) => (Direction::Push, sub),
		Some(("pull", sub)) => (Direction::Pull, sub),
		_ => return ExitCode::from(1),
	};

	init_tracing(sub.get_count("verbose"), sub.get_count("quiet"));

	let config = match load_config(sub) {
		Ok(config) => config,
		Err(e) => {
			error!("{}", e);
			return ExitCode::from(1);
		}
	};

	let (Some(local), Some(device)) = (sub.get_one::<String>("local"), sub.get_one::<String>("device"))
	else {
		return ExitCode::from(1);
	};

	utils::setup_signal_handlers();

	match sync::run(&config, direction, local, device).await {
		Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
		Ok(outcome) => {
			if let Some(report) = &outcome.report {
				for e in report.failures() {
					error!("{}", e);
				}
			}
			ExitCode::from(2)
		}
		Err(e) => {
			error!("{}", e);
			ExitCode::from(1)
		}
	}
}


// vim: ts=4
