//! `group`: groups through groupadd, groupdel, groupmod and getent.

use super::{columns, unhandled, SYSTEM_ID_LIMIT};
use serde::Serialize;
use serde_json::json;
use usc_dispatch::{
    ActionResult, ActionSpec, Call, ExecContext, HandlerError, HandlerResult, Module, ModuleSpec,
    ParameterSpec,
};
use usc_exec::CommandLine;

pub struct Group;

impl Module for Group {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("group", "Manage groups")
            .action(
                ActionSpec::new("add", "Create a group")
                    .param(ParameterSpec::primary("group", "Name of the new group"))
                    .param(ParameterSpec::named("gid", "Numeric group id"))
                    .param(ParameterSpec::named("user", "Comma-separated users to add as members"))
                    .param(ParameterSpec::flag("system", "Create a system group"))
                    .param(ParameterSpec::named("chroot", "Apply the change inside this root directory"))
                    .note("A member that cannot be added is reported but does not fail the action.")
                    .example("usc group add:developers user:chenxi,alice", "Create developers with two members")
                    .example("usc group add:backup gid:990 system:true", "Create a system group with a fixed gid"),
            )
            .action(
                ActionSpec::new("del", "Delete a group")
                    .param(ParameterSpec::primary("group", "Group to delete"))
                    .example("usc group del:developers", "Delete developers"),
            )
            .action(
                ActionSpec::new("mod", "Rename a group or change its gid")
                    .param(ParameterSpec::primary("group", "Group to change"))
                    .param(ParameterSpec::named("name", "New group name"))
                    .param(ParameterSpec::named("gid", "New numeric group id"))
                    .example("usc group mod:developers name:devs", "Rename developers to devs"),
            )
            .action(
                ActionSpec::new("list", "List groups")
                    .param(ParameterSpec::primary("type", "all, system or user").default("all"))
                    .example("usc group list:user", "List groups with a gid of 1000 or more"),
            )
            .action(
                ActionSpec::new("info", "Show details of a group")
                    .param(ParameterSpec::primary("group", "Group to show"))
                    .param(ParameterSpec::flag("users", "Also list the members"))
                    .example("usc group info:wheel users:true", "Show wheel and its members"),
            )
    }

    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
        match call.action.as_str() {
            "add" => add(call, ctx),
            "del" => del(call, ctx),
            "mod" => modify(call, ctx),
            "list" => list(call, ctx),
            "info" => info(call, ctx),
            _ => Err(unhandled(call)),
        }
    }
}

/// One `getent group` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
    pub system: bool,
    pub members: Vec<String>,
}

impl GroupEntry {
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim_end().split(':');
        let name = fields.next()?.to_string();
        let _password = fields.next()?;
        let gid: u32 = fields.next()?.parse().ok()?;
        let members = fields
            .next()
            .unwrap_or_default()
            .split(',')
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect();
        Some(Self {
            name,
            gid,
            system: gid < SYSTEM_ID_LIMIT,
            members,
        })
    }
}

fn add(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let group = call.action_value();
    let gid = call.get("gid");

    if let Some(gid) = gid {
        let existing = ctx.probe(&CommandLine::new("getent").args(["group", gid]))?;
        if existing.success() {
            tracing::warn!(gid, holder = existing.stdout.split(':').next().unwrap_or_default(), "gid already in use");
        }
    }

    let out = ctx.run(
        &ctx.privileged("groupadd")
            .opt("-R", call.get("chroot"))
            .arg_if(call.flag("system"), "-r")
            .opt("-g", gid)
            .arg(group),
    )?;

    let mut members = Vec::new();
    let mut failed = Vec::new();
    for user in call.list("user") {
        let added = ctx.probe(&ctx.privileged("usermod").args(["-aG", group, user]))?;
        if added.success() {
            members.push(user);
        } else {
            tracing::warn!(user, group, stderr = added.stderr.trim(), "could not add member");
            failed.push(user);
        }
    }

    Ok(ActionResult::from(out).with_data(json!({
        "group": group,
        "members": members,
        "failed": failed,
    })))
}

fn del(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let group = call.action_value();
    let out = ctx.run(&ctx.privileged("groupdel").arg(group))?;
    Ok(ActionResult::from(out).with_data(json!({ "group": group })))
}

fn modify(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let group = call.action_value();
    let name = call.get("name");
    let gid = call.get("gid");
    if name.is_none() && gid.is_none() {
        return Err(HandlerError::missing("name|gid", "`group mod` needs a new name or gid"));
    }

    let out = ctx.run(
        &ctx.privileged("groupmod")
            .opt("-n", name)
            .opt("-g", gid)
            .arg(group),
    )?;
    Ok(ActionResult::from(out).with_data(json!({
        "group": name.unwrap_or(group),
        "gid": gid,
    })))
}

fn list(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let filter = call.value_in(&["all", "system", "user"])?;
    let out = ctx.run(&CommandLine::new("getent").arg("group"))?;

    let mut groups: Vec<GroupEntry> = out
        .stdout
        .lines()
        .filter_map(GroupEntry::parse)
        .filter(|g| match filter {
            "system" => g.system,
            "user" => !g.system,
            _ => true,
        })
        .collect();
    groups.sort_by(|a, b| a.name.cmp(&b.name));

    let rows: Vec<Vec<String>> = groups
        .iter()
        .map(|g| vec![g.name.clone(), g.gid.to_string(), g.members.join(",")])
        .collect();

    Ok(ActionResult {
        stdout: columns(&["NAME", "GID", "MEMBERS"], &rows),
        ..ActionResult::from(out)
    }
    .with_data(json!(groups)))
}

fn info(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let name = call.action_value();
    let out = ctx.probe(&CommandLine::new("getent").args(["group", name]))?;
    let entry = out
        .stdout
        .lines()
        .find_map(GroupEntry::parse)
        .filter(|_| out.success())
        .ok_or_else(|| HandlerError::invalid("group", name, "an existing group"))?;

    let mut text = format!("name: {}\ngid: {}\nsystem: {}\n", entry.name, entry.gid, entry.system);
    let mut data = json!({
        "name": entry.name,
        "gid": entry.gid,
        "system": entry.system,
    });
    if call.flag("users") {
        text.push_str(&format!("members: {}\n", entry.members.join(" ")));
        data["members"] = json!(entry.members);
    }
    Ok(ActionResult {
        stdout: text,
        ..ActionResult::from(out)
    }
    .with_data(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use usc_exec::testing::{Reply, ScriptedRunner};

    const GROUPS: &str = "\
root:x:0:
wheel:x:10:chenxi,alice
docker:x:992:chenxi
chenxi:x:1000:
";

    fn call(action: &str, value: &str) -> Call {
        Call::new("group", action).primary("group", value)
    }

    #[test]
    fn test_parse_group_entry() {
        let wheel = GroupEntry::parse("wheel:x:10:chenxi,alice\n").unwrap();
        assert_eq!(wheel.members, ["chenxi", "alice"]);
        assert!(wheel.system);
        assert!(GroupEntry::parse("users:x:100").unwrap().members.is_empty());
        assert!(GroupEntry::parse("broken").is_none());
    }

    #[test]
    fn test_add_with_members() {
        let runner = ScriptedRunner::new()
            .reply("usermod", Reply::ok(""))
            .reply("usermod", Reply::fail(6, "usermod: user 'ghost' does not exist\n"));
        let ctx = ExecContext::new(&runner, true);
        let call = call("add", "developers").param("user", "chenxi,ghost");

        let result = Group.handle(&call, &ctx).unwrap();
        assert!(result.success);
        assert_eq!(
            runner.lines(),
            [
                "sudo groupadd developers",
                "sudo usermod -aG developers chenxi",
                "sudo usermod -aG developers ghost",
            ]
        );
        let data = result.data.unwrap();
        assert_eq!(data["members"], json!(["chenxi"]));
        assert_eq!(data["failed"], json!(["ghost"]));
    }

    #[test]
    fn test_add_system_group_with_gid() {
        let runner = ScriptedRunner::new().reply("getent", Reply::fail(2, ""));
        let ctx = ExecContext::new(&runner, false);
        let call = call("add", "backup")
            .param("gid", "990")
            .param("system", "true")
            .param("chroot", "/mnt/root");

        Group.handle(&call, &ctx).unwrap();
        assert_eq!(
            runner.lines(),
            ["getent group 990", "groupadd -R /mnt/root -r -g 990 backup"]
        );
    }

    #[test]
    fn test_mod_needs_a_change() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, true);
        assert!(Group.handle(&call("mod", "devs"), &ctx).is_err());

        Group
            .handle(&call("mod", "developers").param("name", "devs"), &ctx)
            .unwrap();
        assert_eq!(runner.lines(), ["sudo groupmod -n devs developers"]);
    }

    #[test]
    fn test_list_user_groups() {
        let runner = ScriptedRunner::new().reply("getent", Reply::ok(GROUPS));
        let ctx = ExecContext::new(&runner, true);

        let result = Group.handle(&call("list", "user"), &ctx).unwrap();
        assert_eq!(result.data.unwrap(), json!([{"name": "chenxi", "gid": 1000, "system": false, "members": []}]));
        assert_eq!(result.stdout, "NAME    GID   MEMBERS\nchenxi  1000\n");
    }

    #[test]
    fn test_info_with_members() {
        let runner = ScriptedRunner::new().reply("getent", Reply::ok("wheel:x:10:chenxi,alice\n"));
        let ctx = ExecContext::new(&runner, true);

        let result = Group
            .handle(&call("info", "wheel").param("users", "true"), &ctx)
            .unwrap();
        assert_eq!(result.stdout, "name: wheel\ngid: 10\nsystem: true\nmembers: chenxi alice\n");
        assert_eq!(result.data.unwrap()["members"], json!(["chenxi", "alice"]));
    }

    #[test]
    fn test_info_unknown_group() {
        let runner = ScriptedRunner::new().reply("getent", Reply::fail(2, ""));
        let ctx = ExecContext::new(&runner, true);
        let err = Group.handle(&call("info", "nope"), &ctx).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidValue { .. }));
    }
}
