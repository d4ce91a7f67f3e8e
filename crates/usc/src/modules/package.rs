//! `package`: one set of actions over whichever package manager is installed.

use super::distro::{PackageManager, PackageOp};
use super::unhandled;
use serde_json::json;
use usc_dispatch::{
    ActionResult, ActionSpec, Call, ExecContext, HandlerResult, Module, ModuleSpec, ParameterSpec,
};

pub struct Package;

impl Module for Package {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("package", "Install, remove, update and search packages")
            .action(
                ActionSpec::new("install", "Install a package")
                    .param(ParameterSpec::primary("name", "Package name"))
                    .note("The package manager is detected from PATH: dnf, yum, apt, apt-get, zypper, then pacman.")
                    .example("usc package install:vim", "Install vim"),
            )
            .action(
                ActionSpec::new("remove", "Remove a package")
                    .param(ParameterSpec::primary("name", "Package name"))
                    .param(ParameterSpec::flag("purge", "Also remove configuration files"))
                    .example("usc package remove:apache2 purge:true", "Remove apache2 and its configuration"),
            )
            .action(
                ActionSpec::new("update", "Upgrade one package or all of them")
                    .param(ParameterSpec::primary("name", "Package name, or all").default("all"))
                    .example("usc package update", "Refresh metadata and upgrade everything")
                    .example("usc package update:openssl", "Upgrade only openssl"),
            )
            .action(
                ActionSpec::new("search", "Search package names and descriptions")
                    .param(ParameterSpec::primary("keyword", "Text to look for"))
                    .example("usc package search:nginx", "Find nginx packages"),
            )
            .action(
                ActionSpec::new("list", "List installed packages")
                    .param(
                        ParameterSpec::primary("filter", "installed, or a name pattern")
                            .default("installed"),
                    )
                    .example("usc package list:'python3*'", "Installed python3 packages"),
            )
            .action(
                ActionSpec::new("info", "Show details of a package")
                    .param(ParameterSpec::primary("name", "Package name"))
                    .example("usc package info:curl", "Version, size and description of curl"),
            )
    }

    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
        let value = call.action_value();
        let op = match call.action.as_str() {
            "install" => PackageOp::Install(value),
            "remove" => PackageOp::Remove {
                name: value,
                purge: call.flag("purge"),
            },
            "update" => PackageOp::Update(Some(value).filter(|v| *v != "all")),
            "search" => PackageOp::Search(value),
            "list" => PackageOp::List(Some(value).filter(|v| *v != "installed")),
            "info" => PackageOp::Info(value),
            _ => return Err(unhandled(call)),
        };

        let manager = PackageManager::detect(ctx)?;
        let cmds = manager.commands(op, ctx);
        let result = match ctx.run_all(&cmds)? {
            Some(out) => ActionResult::from(out),
            None => ActionResult::ok(""),
        };
        Ok(result.with_data(json!({
            "manager": manager.program(),
            "action": call.action,
            "package": value,
        })))
    }
}
