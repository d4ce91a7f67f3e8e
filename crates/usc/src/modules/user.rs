//! `user`: accounts through useradd, userdel, usermod and getent.

use super::{columns, unhandled, SYSTEM_ID_LIMIT};
use serde::Serialize;
use serde_json::{json, Map, Value};
use usc_dispatch::{
    ActionResult, ActionSpec, Call, ExecContext, HandlerError, HandlerResult, Module,
    ModuleSpec, ParameterSpec,
};
use usc_exec::CommandLine;

const NOLOGIN: &str = "/sbin/nologin";

/// Fields `user info` can show, in display order.
const INFO_FIELDS: &[&str] = &[
    "username", "uid", "gid", "group", "groups", "home", "shell", "comment", "system", "lock",
];
const BASE_FIELDS: &[&str] = &["username", "uid", "gid", "group"];

pub struct User;

impl Module for User {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("user", "Manage user accounts")
            .action(
                ActionSpec::new("add", "Create a user account")
                    .param(ParameterSpec::primary("username", "Name of the new account"))
                    .param(ParameterSpec::named("home", "Home directory (default /home/<username>)"))
                    .param(ParameterSpec::named("shell", "Login shell").default("/bin/bash"))
                    .param(ParameterSpec::named(
                        "group",
                        "Comma-separated groups; the first is the primary group",
                    ))
                    .param(ParameterSpec::named("uid", "Numeric user id"))
                    .param(ParameterSpec::named("comment", "Comment (GECOS) field"))
                    .param(ParameterSpec::named("chroot", "Base directory for the home directory"))
                    .param(ParameterSpec::flag(
                        "system",
                        "Create a system account without a home directory",
                    ))
                    .param(ParameterSpec::named("password", "Initial password, set with chpasswd"))
                    .param(ParameterSpec::flag("force_change", "Expire the password so it must be changed at first login"))
                    .param(ParameterSpec::flag("lock", "Lock the account once created"))
                    .note("Without `group`, a group named after the user is created.")
                    .note("`system:true` takes precedence: the shell becomes /sbin/nologin.")
                    .note("The password is fed to chpasswd on stdin and never appears in a command line.")
                    .example(
                        "usc user add:chenxi home:/home/chenxi",
                        "Create chenxi with an explicit home directory",
                    )
                    .example(
                        "usc user add:deploy group:deploy,docker shell:/bin/zsh",
                        "Primary group deploy, also a member of docker",
                    ),
            )
            .action(
                ActionSpec::new("del", "Delete a user account")
                    .param(ParameterSpec::primary("username", "Account to delete"))
                    .param(ParameterSpec::flag("home", "Also remove the home directory and mail spool"))
                    .param(ParameterSpec::flag("group", "Also remove the group named after the user"))
                    .example("usc user del:chenxi home:true", "Delete chenxi and their home directory"),
            )
            .action(
                ActionSpec::new("mod", "Change a user account")
                    .param(ParameterSpec::primary("username", "Account name or numeric uid"))
                    .param(ParameterSpec::named("home", "New home directory; contents are moved"))
                    .param(ParameterSpec::named(
                        "group",
                        "Primary group, then supplementary groups; a leading comma keeps the primary group",
                    ))
                    .param(ParameterSpec::named("shell", "New login shell"))
                    .param(ParameterSpec::named("uid", "New numeric user id"))
                    .param(ParameterSpec::named("uname", "New account name"))
                    .param(ParameterSpec::named("comment", "New comment (GECOS) field"))
                    .param(ParameterSpec::named("lock", "true locks the account, false unlocks it"))
                    .param(ParameterSpec::named("password", "New password, set with chpasswd"))
                    .note("Supplementary groups given here replace the current ones.")
                    .example("usc user mod:chenxi shell:/bin/zsh", "Change chenxi's login shell"),
            )
            .action(
                ActionSpec::new("list", "List user accounts")
                    .param(
                        ParameterSpec::primary("type", "login, nologin or all").default("login"),
                    )
                    .note("An account can log in unless its shell ends in /nologin, /false or /sync.")
                    .example("usc user list:all", "List every account"),
            )
            .action(
                ActionSpec::new("info", "Show details of a user account")
                    .param(ParameterSpec::primary("username", "Account to show"))
                    .param(
                        ParameterSpec::named(
                            "list",
                            "base, all, or comma-separated fields: username, uid, gid, group, groups, home, shell, comment, system, lock",
                        )
                        .default("base"),
                    )
                    .example("usc user info:chenxi list:shell,groups", "Show chenxi's shell and groups"),
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

/// One `getent passwd` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub username: String,
    pub uid: u32,
    pub gid: u32,
    pub comment: String,
    pub home: String,
    pub shell: String,
    pub can_login: bool,
    pub system: bool,
}

impl Account {
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.trim_end().split(':').collect();
        let [username, _, uid, gid, comment, home, shell] = fields.as_slice() else {
            return None;
        };
        let uid: u32 = uid.parse().ok()?;
        let can_login = !["/nologin", "/false", "/sync"]
            .iter()
            .any(|suffix| shell.ends_with(suffix));
        Some(Self {
            username: username.to_string(),
            uid,
            gid: gid.parse().ok()?,
            comment: comment.to_string(),
            home: home.to_string(),
            shell: shell.to_string(),
            can_login,
            system: uid < SYSTEM_ID_LIMIT,
        })
    }
}

fn add(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let username = call.action_value();
    let system = call.flag("system");
    let shell = if system { Some(NOLOGIN) } else { call.get("shell") };

    let mut cmd = ctx
        .privileged("useradd")
        .arg(if system { "-r" } else { "-m" })
        .opt("-d", call.get("home"))
        .opt("-b", call.get("chroot"))
        .opt("-s", shell);
    let groups = call.list("group");
    cmd = match groups.split_first() {
        Some((primary, rest)) => cmd
            .args(["-g", *primary])
            .opt("-G", Some(rest.join(",")).filter(|g| !g.is_empty()).as_deref()),
        None => cmd.arg("-U"),
    };
    let cmd = cmd
        .opt("-u", call.get("uid"))
        .opt("-c", call.supplied("comment"))
        .arg(username);
    let out = ctx.run(&cmd)?;

    if let Some(password) = call.get("password") {
        set_password(ctx, username, password)?;
    }
    if call.flag("force_change") {
        ctx.run(&ctx.privileged("chage").args(["-d", "0", username]))?;
    }
    if call.flag("lock") {
        ctx.run(&ctx.privileged("usermod").args(["-L", username]))?;
    }

    Ok(ActionResult::from(out).with_data(json!({
        "username": username,
        "system": system,
        "shell": shell,
        "groups": groups,
        "locked": call.flag("lock"),
    })))
}

fn del(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let username = call.action_value();
    let out = ctx.run(
        &ctx.privileged("userdel")
            .arg_if(call.flag("home"), "-r")
            .arg(username),
    )?;

    let mut group_removed = false;
    if call.flag("group") {
        // userdel usually removes the user's private group already
        let lookup = ctx.probe(&CommandLine::new("getent").args(["group", username]))?;
        if lookup.success() {
            ctx.run(&ctx.privileged("groupdel").arg(username))?;
            group_removed = true;
        } else {
            tracing::debug!(group = username, "no group left to remove");
        }
    }

    Ok(ActionResult::from(out).with_data(json!({
        "username": username,
        "home_removed": call.flag("home"),
        "group_removed": group_removed,
    })))
}

fn modify(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let username = resolve_account(ctx, call.action_value())?;

    let mut options: Vec<String> = Vec::new();
    if let Some(home) = call.get("home") {
        options.extend(["-d".to_string(), home.to_string(), "-m".to_string()]);
    }
    if let Some(spec) = call.get("group") {
        let mut parts = spec.split(',').map(str::trim);
        let primary = parts.next().filter(|p| !p.is_empty());
        let rest: Vec<&str> = parts.filter(|p| !p.is_empty()).collect();
        if let Some(primary) = primary {
            options.extend(["-g".to_string(), primary.to_string()]);
        }
        if !rest.is_empty() {
            options.extend(["-G".to_string(), rest.join(",")]);
        }
    }
    for (param, flag) in [("shell", "-s"), ("uid", "-u"), ("uname", "-l")] {
        if let Some(value) = call.get(param) {
            options.extend([flag.to_string(), value.to_string()]);
        }
    }
    // `comment:` clears the field
    if let Some(comment) = call.supplied("comment") {
        options.extend(["-c".to_string(), comment.to_string()]);
    }
    if call.get("lock").is_some() {
        options.push(if call.flag("lock") { "-L" } else { "-U" }.into());
    }

    let password = call.get("password");
    if options.is_empty() && password.is_none() {
        return Err(HandlerError::missing(
            "home|group|shell|uid|uname|comment|lock|password",
            "`user mod` needs at least one attribute to change",
        ));
    }

    let mut last = None;
    if !options.is_empty() {
        last = Some(ctx.run(&ctx.privileged("usermod").args(&options).arg(&username))?);
    }
    if let Some(password) = password {
        // a rename above changes the name chpasswd must use
        let name = call.get("uname").unwrap_or(&username);
        last = Some(set_password(ctx, name, password)?);
    }

    let result = last.map(ActionResult::from).unwrap_or_else(|| ActionResult::ok(""));
    Ok(result.with_data(json!({ "username": call.get("uname").unwrap_or(&username) })))
}

fn list(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let filter = call.value_in(&["login", "nologin", "all"])?;
    let out = ctx.run(&CommandLine::new("getent").arg("passwd"))?;

    let mut accounts: Vec<Account> = out
        .stdout
        .lines()
        .filter_map(Account::parse)
        .filter(|a| match filter {
            "login" => a.can_login,
            "nologin" => !a.can_login,
            _ => true,
        })
        .collect();
    accounts.sort_by(|a, b| a.username.cmp(&b.username));

    let rows: Vec<Vec<String>> = accounts
        .iter()
        .map(|a| {
            vec![
                a.username.clone(),
                a.uid.to_string(),
                a.gid.to_string(),
                a.home.clone(),
                a.shell.clone(),
            ]
        })
        .collect();
    let text = columns(&["USERNAME", "UID", "GID", "HOME", "SHELL"], &rows);

    Ok(ActionResult {
        stdout: text,
        ..ActionResult::from(out)
    }
    .with_data(json!(accounts)))
}

fn info(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let username = call.action_value();
    let fields = info_fields(call.get("list").unwrap_or("base"))?;

    let entry = ctx.probe(&CommandLine::new("getent").args(["passwd", username]))?;
    let account = entry
        .stdout
        .lines()
        .find_map(Account::parse)
        .filter(|_| entry.success())
        .ok_or_else(|| HandlerError::invalid("username", username, "an existing user"))?;

    let gid = account.gid.to_string();
    let group = ctx.probe(&CommandLine::new("getent").args(["group", gid.as_str()]))?;
    let group_name = group
        .stdout
        .split(':')
        .next()
        .filter(|_| group.success())
        .unwrap_or_default()
        .trim()
        .to_string();

    let ids = ctx.probe(&CommandLine::new("id").args(["-Gn", username]))?;
    let groups: Vec<&str> = if ids.success() {
        ids.stdout.split_whitespace().collect()
    } else {
        Vec::new()
    };

    let status = ctx.probe(&ctx.privileged("passwd").args(["-S", username]))?;
    let locked = status.success()
        && matches!(status.stdout.split_whitespace().nth(1), Some("L" | "LK"));

    let mut all = Map::new();
    all.insert("username".into(), json!(account.username));
    all.insert("uid".into(), json!(account.uid));
    all.insert("gid".into(), json!(account.gid));
    all.insert("group".into(), json!(group_name));
    all.insert("groups".into(), json!(groups));
    all.insert("home".into(), json!(account.home));
    all.insert("shell".into(), json!(account.shell));
    all.insert("comment".into(), json!(account.comment));
    all.insert("system".into(), json!(account.system));
    all.insert("lock".into(), json!(locked));

    let data: Map<String, Value> = fields
        .iter()
        .filter_map(|f| all.get(*f).map(|v| (f.to_string(), v.clone())))
        .collect();
    let text: String = data
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{}: {}\n", k, s),
            Value::Array(items) => format!(
                "{}: {}\n",
                k,
                items.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" ")
            ),
            other => format!("{}: {}\n", k, other),
        })
        .collect();

    Ok(ActionResult::ok(text).with_data(Value::Object(data)))
}

fn info_fields(list: &str) -> Result<Vec<&'static str>, HandlerError> {
    match list {
        "all" => Ok(INFO_FIELDS.to_vec()),
        "base" => Ok(BASE_FIELDS.to_vec()),
        custom => custom
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| {
                INFO_FIELDS
                    .iter()
                    .copied()
                    .find(|known| *known == f)
                    .ok_or_else(|| {
                        HandlerError::invalid("list", f, "base, all, or fields from: username, uid, gid, group, groups, home, shell, comment, system, lock")
                    })
            })
            .collect(),
    }
}

/// Numeric ids are looked up; names are used as given.
fn resolve_account(ctx: &ExecContext<'_>, value: &str) -> Result<String, HandlerError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(value.to_string());
    }
    let entry = ctx.probe(&CommandLine::new("getent").args(["passwd", value]))?;
    entry
        .stdout
        .lines()
        .find_map(Account::parse)
        .filter(|_| entry.success())
        .map(|a| a.username)
        .ok_or_else(|| HandlerError::invalid("username", value, "an existing user name or uid"))
}

fn set_password(
    ctx: &ExecContext<'_>,
    username: &str,
    password: &str,
) -> Result<usc_exec::Captured, HandlerError> {
    let cmd = ctx
        .privileged("chpasswd")
        .stdin(format!("{}:{}\n", username, password));
    Ok(ctx.run(&cmd)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use usc_exec::testing::{Reply, ScriptedRunner};

    const PASSWD: &str = "\
root:x:0:0:root:/root:/bin/bash
daemon:x:2:2:daemon:/sbin:/sbin/nologin
chenxi:x:1000:1000:Chen Xi:/home/chenxi:/bin/zsh
backup:x:34:34:backup:/var/backups:/usr/sbin/nologin
alice:x:1001:1001::/home/alice:/bin/bash
";

    fn call(action: &str, value: &str) -> Call {
        Call::new("user", action).primary("username", value)
    }

    #[test]
    fn test_parse_account() {
        let account = Account::parse("chenxi:x:1000:1000:Chen Xi:/home/chenxi:/bin/zsh").unwrap();
        assert_eq!(account.username, "chenxi");
        assert!(account.can_login);
        assert!(!account.system);

        let daemon = Account::parse("daemon:x:2:2:daemon:/sbin:/sbin/nologin").unwrap();
        assert!(!daemon.can_login);
        assert!(daemon.system);

        assert!(Account::parse("broken:x:1").is_none());
    }

    #[test]
    fn test_add_with_home() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, true);
        let call = call("add", "chenxi")
            .param("home", "/home/chenxi")
            .param("shell", "/bin/bash");

        let result = User.handle(&call, &ctx).unwrap();
        assert!(result.success);
        assert_eq!(
            runner.lines(),
            ["sudo useradd -m -d /home/chenxi -s /bin/bash -U chenxi"]
        );
    }

    #[test]
    fn test_add_system_account_with_groups() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, false);
        let call = call("add", "svc")
            .param("shell", "/bin/bash")
            .param("group", "svc,docker,wheel")
            .param("uid", "420")
            .param("system", "true")
            .param("lock", "true");

        User.handle(&call, &ctx).unwrap();
        assert_eq!(
            runner.lines(),
            [
                "useradd -r -s /sbin/nologin -g svc -G docker,wheel -u 420 svc",
                "usermod -L svc",
            ]
        );
    }

    #[test]
    fn test_add_password_goes_through_stdin() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, true);
        let call = call("add", "chenxi")
            .param("password", "s3cret")
            .param("force_change", "true");

        User.handle(&call, &ctx).unwrap();
        let commands = runner.commands();
        assert_eq!(commands[1].to_string(), "sudo chpasswd");
        assert_eq!(
            commands[1].get_input(),
            &usc_exec::Input::Data("chenxi:s3cret\n".into())
        );
        assert_eq!(commands[2].to_string(), "sudo chage -d 0 chenxi");
        assert!(runner.lines().iter().all(|l| !l.contains("s3cret")));
    }

    #[test]
    fn test_add_failure_stops_early() {
        let runner = ScriptedRunner::new()
            .reply("useradd", Reply::fail(9, "useradd: user 'chenxi' already exists\n"));
        let ctx = ExecContext::new(&runner, true);
        let call = call("add", "chenxi").param("password", "pw");

        let err = User.handle(&call, &ctx).unwrap_err();
        assert_eq!(err.exit_code(), 9);
        assert_eq!(runner.lines().len(), 1);
    }

    #[test]
    fn test_del() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, true);
        User.handle(&call("del", "chenxi"), &ctx).unwrap();
        assert_eq!(runner.lines(), ["sudo userdel chenxi"]);
    }

    #[test]
    fn test_del_with_home_and_leftover_group() {
        let runner = ScriptedRunner::new().reply("getent", Reply::ok("chenxi:x:1000:\n"));
        let ctx = ExecContext::new(&runner, true);
        let call = call("del", "chenxi").param("home", "true").param("group", "true");

        let result = User.handle(&call, &ctx).unwrap();
        assert_eq!(
            runner.lines(),
            ["sudo userdel -r chenxi", "getent group chenxi", "sudo groupdel chenxi"]
        );
        assert_eq!(result.data.unwrap()["group_removed"], json!(true));
    }

    #[test]
    fn test_del_group_already_gone() {
        let runner = ScriptedRunner::new().reply("getent", Reply::fail(2, ""));
        let ctx = ExecContext::new(&runner, true);
        let call = call("del", "chenxi").param("group", "true");

        User.handle(&call, &ctx).unwrap();
        assert_eq!(runner.lines(), ["sudo userdel chenxi", "getent group chenxi"]);
    }

    #[test]
    fn test_mod_by_uid() {
        let runner = ScriptedRunner::new()
            .reply("getent", Reply::ok("chenxi:x:1000:1000:Chen Xi:/home/chenxi:/bin/zsh\n"));
        let ctx = ExecContext::new(&runner, true);
        let call = call("mod", "1000")
            .param("group", ",docker,wheel")
            .param("shell", "/bin/bash")
            .param("lock", "false");

        User.handle(&call, &ctx).unwrap();
        assert_eq!(
            runner.lines(),
            [
                "getent passwd 1000",
                "sudo usermod -G docker,wheel -s /bin/bash -U chenxi",
            ]
        );
    }

    #[test]
    fn test_mod_rename_then_password() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, false);
        let call = call("mod", "chenxi")
            .param("home", "/srv/cx")
            .param("uname", "cx")
            .param("password", "pw");

        User.handle(&call, &ctx).unwrap();
        let commands = runner.commands();
        assert_eq!(commands[0].to_string(), "usermod -d /srv/cx -m -l cx chenxi");
        assert_eq!(commands[1].get_input(), &usc_exec::Input::Data("cx:pw\n".into()));
    }

    #[test]
    fn test_mod_empty_comment_clears_field() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, true);
        User.handle(&call("mod", "chenxi").param("comment", ""), &ctx)
            .unwrap();
        assert_eq!(runner.lines(), ["sudo usermod -c '' chenxi"]);
        assert_eq!(runner.commands()[0].get_args(), ["usermod", "-c", "", "chenxi"]);
    }

    #[test]
    fn test_mod_without_changes() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, true);
        let err = User.handle(&call("mod", "chenxi"), &ctx).unwrap_err();
        assert!(matches!(err, HandlerError::MissingParameter { .. }));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let runner = ScriptedRunner::new().reply("getent", Reply::ok(PASSWD));
        let ctx = ExecContext::new(&runner, true);

        let result = User.handle(&call("list", "login"), &ctx).unwrap();
        let names: Vec<_> = result.data.as_ref().unwrap().as_array().unwrap().iter()
            .map(|u| u["username"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["alice", "chenxi", "root"]);
        assert!(result.stdout.starts_with("USERNAME  UID   GID   HOME"), "{}", result.stdout);
    }

    #[test]
    fn test_list_nologin() {
        let runner = ScriptedRunner::new().reply("getent", Reply::ok(PASSWD));
        let ctx = ExecContext::new(&runner, true);

        let result = User.handle(&call("list", "nologin"), &ctx).unwrap();
        assert_eq!(result.data.unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_list_rejects_unknown_filter() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, true);
        let err = User.handle(&call("list", "robots"), &ctx).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidValue { .. }));
    }

    #[test]
    fn test_info_fields() {
        let runner = ScriptedRunner::new()
            .reply("getent", Reply::ok("chenxi:x:1000:1000:Chen Xi:/home/chenxi:/bin/zsh\n"))
            .reply("getent", Reply::ok("chenxi:x:1000:\n"))
            .reply("id", Reply::ok("chenxi wheel docker\n"))
            .reply("passwd", Reply::ok("chenxi LK 2024-01-01 0 99999 7 -1\n"));
        let ctx = ExecContext::new(&runner, true);
        let call = call("info", "chenxi").param("list", "shell,groups,lock");

        let result = User.handle(&call, &ctx).unwrap();
        assert_eq!(
            result.data.unwrap(),
            json!({"shell": "/bin/zsh", "groups": ["chenxi", "wheel", "docker"], "lock": true})
        );
        assert_eq!(result.stdout, "shell: /bin/zsh\ngroups: chenxi wheel docker\nlock: true\n");
        assert_eq!(runner.lines()[3], "sudo passwd -S chenxi");
    }

    #[test]
    fn test_info_unknown_user() {
        let runner = ScriptedRunner::new().reply("getent", Reply::fail(2, ""));
        let ctx = ExecContext::new(&runner, true);
        let err = User.handle(&call("info", "ghost").param("list", "base"), &ctx).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_info_unknown_field() {
        assert!(info_fields("shell,colour").is_err());
        assert_eq!(info_fields("base").unwrap(), BASE_FIELDS);
    }
}
