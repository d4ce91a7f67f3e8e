//! `file`: copies, moves and inspection through coreutils, find and rsync.

use super::unhandled;
use serde_json::json;
use usc_dispatch::{
    ActionResult, ActionSpec, Call, ExecContext, HandlerResult, Module, ModuleSpec, ParameterSpec,
};
use usc_exec::{CommandLine, ExecError};

const ARCHIVE_PRESERVE: &str = "mode,ownership,timestamps,xattr,context";

pub struct File;

impl Module for File {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("file", "Copy, move, inspect and synchronize files")
            .action(
                ActionSpec::new("copy", "Copy files or directories")
                    .alias("cp")
                    .param(ParameterSpec::primary(
                        "source",
                        "Path to copy; a trailing / copies the directory's contents",
                    ))
                    .param(ParameterSpec::named("dest", "Destination directory"))
                    .param(ParameterSpec::flag("archive", "Keep links, modes, owners, timestamps and attributes").default("true"))
                    .param(ParameterSpec::flag("recursive", "Copy directories recursively").default("true"))
                    .param(ParameterSpec::flag("verbose", "Print each file copied").default("true"))
                    .param(ParameterSpec::flag("update", "Only copy when the source is newer"))
                    .param(ParameterSpec::named(
                        "preserve",
                        "Attributes to keep: links, mode, owner, time, exmode, context",
                    ))
                    .param(ParameterSpec::flag("softlink", "Copy symbolic links as links").default("true"))
                    .param(ParameterSpec::flag("force", "Overwrite existing files"))
                    .usage("usc file copy:<source> dest:<dest>")
                    .note("`dest` is always treated as a directory.")
                    .note("Without `force`, existing files are left alone.")
                    .example(
                        "usc file cp:/path/to/src dest:/path/to/dest",
                        "Copy a directory in archive mode",
                    )
                    .example(
                        "usc file cp:/etc/hosts dest:/tmp archive:false preserve:mode,time",
                        "Copy one file keeping only its mode and timestamps",
                    ),
            )
            .action(
                ActionSpec::new("move", "Move or rename files and directories")
                    .alias("mv")
                    .param(ParameterSpec::primary("source", "Path to move"))
                    .param(ParameterSpec::named("dest", "New path"))
                    .param(ParameterSpec::flag("force", "Overwrite without asking"))
                    .usage("usc file move:<source> dest:<dest>")
                    .example("usc file mv:notes.txt dest:archive/notes.txt", "Move a file"),
            )
            .action(
                ActionSpec::new("del", "Delete files or directories")
                    .alias("rm")
                    .param(ParameterSpec::primary("path", "Path to delete"))
                    .param(ParameterSpec::flag("recursive", "Delete directories and their contents"))
                    .param(ParameterSpec::flag("force", "Ignore missing files and never prompt"))
                    .example("usc file rm:/tmp/build recursive:true", "Delete a directory tree"),
            )
            .action(
                ActionSpec::new("mkdir", "Create a directory")
                    .param(ParameterSpec::primary("path", "Directory to create"))
                    .param(ParameterSpec::flag("parents", "Create missing parent directories"))
                    .param(ParameterSpec::named("mode", "Permission bits").default("755"))
                    .example("usc file mkdir:/srv/app/logs parents:true", "Create a nested directory"),
            )
            .action(
                ActionSpec::new("cat", "Print a file")
                    .param(ParameterSpec::primary("path", "File to print"))
                    .param(ParameterSpec::flag("number", "Number the output lines"))
                    .param(ParameterSpec::flag("show_nonprinting", "Show tabs, line ends and control characters"))
                    .example("usc file cat:/etc/hosts number:true", "Print a file with line numbers"),
            )
            .action(
                ActionSpec::new("edit", "Open a file in an editor")
                    .param(ParameterSpec::primary("path", "File to edit"))
                    .param(ParameterSpec::named("editor", "Editor program").default("vi"))
                    .example("usc file edit:/etc/hosts editor:nano", "Edit a file with nano"),
            )
            .action(
                ActionSpec::new("find", "Search for files")
                    .param(ParameterSpec::primary("path", "Directory to search"))
                    .param(ParameterSpec::named("name", "Name pattern"))
                    .param(ParameterSpec::named("type", "f for files, d for directories, l for links"))
                    .example("usc file find:/var/log name:*.log type:f", "Find log files"),
            )
            .action(
                ActionSpec::new("sync", "Synchronize directories with rsync")
                    .param(ParameterSpec::primary(
                        "source",
                        "Path to synchronize; a trailing / syncs the directory's contents",
                    ))
                    .param(ParameterSpec::named("dest", "Destination path or host:path"))
                    .param(ParameterSpec::flag("recursive", "Descend into directories").default("true"))
                    .param(ParameterSpec::flag("delete", "Delete destination files missing from the source"))
                    .param(ParameterSpec::flag("progress", "Show transfer progress"))
                    .param(ParameterSpec::flag("compress", "Compress data in transit"))
                    .param(ParameterSpec::flag("dry_run", "Show what would change without changing it"))
                    .param(ParameterSpec::flag("checksum", "Compare by checksum instead of size and time"))
                    .param(ParameterSpec::named("exclude", "Comma-separated patterns to skip"))
                    .usage("usc file sync:<source> dest:<dest>")
                    .note("Requires rsync.")
                    .example(
                        "usc file sync:/srv/www/ dest:backup:/srv/www delete:true",
                        "Mirror a directory to another host",
                    ),
            )
            .action(
                ActionSpec::new("info", "Show file metadata")
                    .param(ParameterSpec::primary("path", "File to inspect"))
                    .param(ParameterSpec::flag("dereference", "Follow symbolic links"))
                    .example("usc file info:/etc/passwd", "Show size, owner and timestamps"),
            )
    }

    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
        match call.action.as_str() {
            "copy" => copy(call, ctx),
            "move" => {
                let dest = call.require("dest", "`file move` needs a destination")?;
                let cmd = CommandLine::new("mv")
                    .arg_if(call.flag("force"), "-f")
                    .args([call.action_value(), dest]);
                Ok(ctx.run(&cmd)?.into())
            }
            "del" => {
                let cmd = CommandLine::new("rm")
                    .arg_if(call.flag("recursive"), "-r")
                    .arg_if(call.flag("force"), "-f")
                    .arg(call.action_value());
                Ok(ctx.run(&cmd)?.into())
            }
            "mkdir" => {
                let cmd = CommandLine::new("mkdir")
                    .arg_if(call.flag("parents"), "-p")
                    .opt("-m", call.get("mode"))
                    .arg(call.action_value());
                Ok(ctx.run(&cmd)?.into())
            }
            "cat" => {
                let cmd = CommandLine::new("cat")
                    .arg_if(call.flag("number"), "-n")
                    .arg_if(call.flag("show_nonprinting"), "-A")
                    .arg(call.action_value());
                Ok(ctx.run(&cmd)?.into())
            }
            "edit" => {
                let editor = call.get("editor").unwrap_or("vi");
                let cmd = CommandLine::new(editor).arg(call.action_value()).interactive();
                Ok(ctx.follow(&cmd)?)
            }
            "find" => {
                let cmd = CommandLine::new("find")
                    .arg(call.action_value())
                    .opt("-name", call.get("name"))
                    .opt("-type", call.get("type"));
                let out = ctx.run(&cmd)?;
                let found: Vec<&str> = out.stdout.lines().collect();
                let data = json!({ "path": call.action_value(), "matches": found });
                Ok(ActionResult::from(out).with_data(data))
            }
            "sync" => sync(call, ctx),
            "info" => {
                let cmd = CommandLine::new("stat")
                    .arg_if(call.flag("dereference"), "-L")
                    .arg(call.action_value());
                Ok(ctx.run(&cmd)?.into())
            }
            _ => Err(unhandled(call)),
        }
    }
}

fn copy(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let dest = call.require("dest", "`file copy` needs a destination")?;
    let archive = call.flag("archive");
    let recursive = call.flag("recursive");
    let softlink = call.flag("softlink");

    let preserve = call
        .list("preserve")
        .into_iter()
        .map(|item| match item {
            "exmode" => "xattr",
            "time" => "timestamps",
            "owner" => "ownership",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(",");
    let preserve = match (preserve.is_empty(), archive) {
        (false, _) => Some(preserve),
        (true, true) => Some(ARCHIVE_PRESERVE.to_string()),
        (true, false) => None,
    };

    let dest = if dest.ends_with('/') {
        dest.to_string()
    } else {
        format!("{}/", dest)
    };

    let cmd = CommandLine::new("cp")
        .arg(if softlink { "--no-dereference" } else { "--dereference" })
        .args(preserve.map(|p| format!("--preserve={}", p)))
        .arg_if(recursive, "--recursive")
        .arg_if(call.flag("verbose"), "--verbose")
        .arg_if(call.flag("update"), "--update")
        .arg(if call.flag("force") { "--force" } else { "--no-clobber" })
        .args([call.action_value(), dest.as_str()]);
    Ok(ctx.run(&cmd)?.into())
}

fn sync(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let dest = call.require("dest", "`file sync` needs a destination")?;
    if !ctx.has_program("rsync") {
        return Err(ExecError::CommandNotFound {
            program: "rsync".into(),
        }
        .into());
    }

    let excludes = call
        .list("exclude")
        .into_iter()
        .flat_map(|pattern| ["--exclude", pattern]);
    let cmd = CommandLine::new("rsync")
        .arg("-av")
        .arg_if(!call.flag("recursive"), "-d")
        .arg_if(call.flag("delete"), "--delete")
        .arg_if(call.flag("progress"), "--progress")
        .arg_if(call.flag("compress"), "-z")
        .arg_if(call.flag("dry_run"), "--dry-run")
        .arg_if(call.flag("checksum"), "-c")
        .args(excludes)
        .args([call.action_value(), dest]);
    Ok(ctx.run(&cmd)?.into())
}
