//! Terminal editor for profiles: which rows an editor shows, how they read,
//! and the edits a user may make on them.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::errors::Result;
use crate::field::{join_choices, FieldKind, FieldValue, Section};
use crate::profile::{field_spec, plain_spec, Profile, PLAIN_FIELDS, SETTINGS_FIELDS};
use crate::resolve::{effective_settings, field_shown, resolve_field, Role, Tier, View};
use crate::store::{Preferences, ProfileStore};
use crate::utils::{format_field, pretty_line};
use crate::specific_fail;

const LABEL_WIDTH: usize = 26;

/// One line of the editor
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub key: &'static str,
    pub label: &'static str,
    /// `None` for plain fields
    pub section: Option<Section>,
    pub value: String,
    pub tier: Option<Tier>,
    pub editable: bool,
    /// checkbox state, `None` when the row has no checkbox
    pub flag: Option<bool>,
    pub flag_toggleable: bool,
}

impl Row {
    /// (bold, plain) parts of the rendered line
    pub fn line(&self) -> (String, String) {
        let checkbox = match self.flag {
            Some(true) if self.flag_toggleable => "[x] ",
            Some(true) => "[#] ",
            Some(false) => "[ ] ",
            None => "    ",
        };
        let tag = match self.tier {
            Some(Tier::Forced) => "  (forced)",
            Some(Tier::Inherited) => "  (base)",
            _ => "",
        };
        (format!("{}{}", checkbox, format_field(self.label, LABEL_WIDTH, true)),
         format!("{}{}\n", self.value, tag))
    }
}

/// rows for `profile` in `view`. Plain fields are only part of the full
/// editor of an account.
pub fn rows(profile: &Profile,
            role: Role,
            base: &Profile,
            over: &Profile,
            view: View,
            today: NaiveDate)
            -> Vec<Row> {
    let mut out = Vec::new();
    if role == Role::Account && view == View::Full {
        for spec in PLAIN_FIELDS {
            let value = match profile.plain_value(spec.key) {
                Some(v) => v,
                None => continue,
            };
            let shown = if spec.key == "password" && !profile.password.is_empty() {
                "******".to_string()
            } else {
                spec.kind.render(&value, today)
            };
            out.push(Row {
                key: spec.key,
                label: spec.label,
                section: None,
                value: shown,
                tier: None,
                editable: true,
                flag: None,
                flag_toggleable: false,
            });
        }
    }
    for spec in SETTINGS_FIELDS {
        if !field_shown(spec, role, view, &profile.settings, &base.settings, &over.settings) {
            continue;
        }
        let r = match resolve_field(spec, role, view, &profile.settings, &base.settings, &over.settings) {
            Some(r) => r,
            None => continue,
        };
        let own_flag = profile.settings.overridden(spec.key).unwrap_or(false);
        let forced = over.settings.overridden(spec.key).unwrap_or(false);
        let flag = match role {
            Role::Base => None,
            Role::Override => Some(own_flag),
            Role::Account => Some(own_flag || forced),
        };
        out.push(Row {
            key: spec.key,
            label: spec.label,
            section: Some(spec.section),
            value: spec.kind.render(&r.value, today),
            tier: Some(r.tier),
            editable: r.editable,
            flag,
            flag_toggleable: r.flag_toggleable,
        });
    }
    out
}

/// prints rows, with section headers in the full view
pub fn print_rows(rows: &[Row], view: View, tty: bool) -> Result<()> {
    let mut section = None;
    for row in rows {
        if view == View::Full && row.section.is_some() && row.section != section {
            section = row.section;
            if let Some(s) = section {
                pretty_line(&format!("\n{}\n", s), &format!("{}\n", "-".repeat(s.to_string().len())), tty)?;
            }
        }
        let (bold, plain) = row.line();
        let prefix = if view == View::Lite { "    " } else { "" };
        pretty_line(&format!("{}{}", prefix, bold), &plain, tty)?;
    }
    Ok(())
}

/// header line of an account in the list: note, server and user, last run
pub fn account_header(profile: &Profile) -> (String, String) {
    let who = format!("{} {}", profile.server, profile.username);
    let last = if profile.last_end_time.is_empty() {
        String::new()
    } else {
        format!("  last run {}", profile.last_end_time)
    };
    (profile.note.trim().to_string(), format!("{}{}", who.trim_end(), last))
}

/// effective settings of a profile as a flat JSON object of values
pub fn effective_json(profile: &Profile, role: Role, base: &Profile, over: &Profile) -> Value {
    let eff = effective_settings(role, profile, base, over);
    let mut map = Map::new();
    map.insert("id".to_string(), Value::String(profile.id.clone()));
    for spec in SETTINGS_FIELDS {
        let v = match eff.value(spec.key) {
            Some(FieldValue::Text(s)) => Value::String(s),
            Some(FieldValue::Flag(b)) => Value::Bool(b),
            None => continue,
        };
        map.insert(spec.key.to_string(), v);
    }
    Value::Object(map)
}

/// identity and role of the profile `selector` names
pub fn target<P: Preferences>(store: &ProfileStore<P>, selector: &str) -> Result<(String, Role)> {
    let id = match store.select(selector) {
        Some(p) => p.id.clone(),
        None => return specific_fail!(format!("profile '{}' doesn't exist", selector)),
    };
    match store.role_of(&id) {
        Some(role) => Ok((id, role)),
        None => specific_fail!(format!("profile '{}' doesn't exist", selector)),
    }
}

/// checks the resolution of `key` for the target before an edit
fn check_overridable<P: Preferences>(store: &ProfileStore<P>,
                                     id: &str,
                                     role: Role,
                                     key: &str,
                                     want_flag: bool)
                                     -> Result<()> {
    let spec = match field_spec(key) {
        Some(s) => s,
        None => return specific_fail!(format!("unknown field '{}'", key)),
    };
    let profile = match store.get(id) {
        Some(p) => p,
        None => return specific_fail!(format!("profile '{}' doesn't exist", id)),
    };
    let base = store.base();
    let over = store.override_profile();
    let r = match resolve_field(spec, role, View::Full, &profile.settings, &base.settings, &over.settings) {
        Some(r) => r,
        None => return specific_fail!(format!("unknown field '{}'", key)),
    };
    if want_flag && !r.flag_toggleable {
        return match role {
            Role::Base => specific_fail!("the base profile has no override flags".to_string()),
            _ => specific_fail!(format!("'{}' is forced by the override profile", key)),
        };
    }
    if !want_flag && !r.editable {
        return match r.tier {
            Tier::Forced => specific_fail!(format!("'{}' is forced by the override profile", key)),
            _ => specific_fail!(format!("'{}' is inherited from the base profile, \
                                         turn its override flag on first", key)),
        };
    }
    Ok(())
}

/// sets a plain or overridable value from user input
pub fn set_field<P: Preferences>(store: &mut ProfileStore<P>,
                                 selector: &str,
                                 key: &str,
                                 input: &str)
                                 -> Result<()> {
    let (id, role) = target(store, selector)?;
    if let Some(spec) = plain_spec(key) {
        if role != Role::Account {
            return specific_fail!(format!("'{}' only exists on account profiles", key));
        }
        let value = parse_input(spec.kind, key, input)?;
        store.try_update(&id, |p| p.set_plain(key, value))?;
        return Ok(());
    }
    check_overridable(store, &id, role, key, false)?;
    let kind = match field_spec(key) {
        Some(spec) => spec.kind,
        None => return specific_fail!(format!("unknown field '{}'", key)),
    };
    let value = parse_input(kind, key, input)?;
    store.try_update(&id, |p| p.settings.set_value(key, value))?;
    Ok(())
}

/// replaces an account's credentials in one update
pub fn set_login<P: Preferences>(store: &mut ProfileStore<P>,
                                 selector: &str,
                                 username: Option<&str>,
                                 password: &str)
                                 -> Result<()> {
    let (id, role) = target(store, selector)?;
    if role != Role::Account {
        return specific_fail!("only account profiles have a login".to_string());
    }
    store.try_update(&id, |p| {
        if let Some(name) = username {
            p.set_plain("username", FieldValue::from(name))?;
        }
        p.set_plain("password", FieldValue::from(password))
    })?;
    Ok(())
}

fn parse_input(kind: FieldKind, key: &str, input: &str) -> Result<FieldValue> {
    match kind.parse(input) {
        Some(v) => Ok(v),
        None => specific_fail!(format!("'{}' expects on or off, got '{}'", key, input)),
    }
}

/// flips a per-field override flag
pub fn set_override<P: Preferences>(store: &mut ProfileStore<P>,
                                    selector: &str,
                                    key: &str,
                                    on: bool)
                                    -> Result<()> {
    let (id, role) = target(store, selector)?;
    check_overridable(store, &id, role, key, true)?;
    store.try_update(&id, |p| p.settings.set_overridden(key, on))?;
    Ok(())
}

/// stores picked indices of a choice field in normalized form
pub fn pick_choices<P: Preferences>(store: &mut ProfileStore<P>,
                                    selector: &str,
                                    key: &str,
                                    picked: &[usize])
                                    -> Result<String> {
    let choices = match field_spec(key).map(|s| s.kind) {
        Some(FieldKind::Choice(choices)) => choices,
        Some(_) => return specific_fail!(format!("'{}' is not a choice field", key)),
        None => return specific_fail!(format!("unknown field '{}'", key)),
    };
    let joined = join_choices(picked, choices.len());
    set_field(store, selector, key, &joined)?;
    Ok(joined)
}

/// explanation of how settings combine and how jobs are queued
pub static GUIDE: &[(&str, &str)] = &[
    ("settings composition",
     "base profile + account N's own overrides + override profile's forced fields = account N's settings"),
    ("job queue",
     "Each account's daily and extra jobs join the queue at their own scheduled times, based on \
      when they last finished. The queue is ordered by priority (higher first), then by time \
      queued (earlier first). Only the first job runs at any moment. Daily jobs default to \
      priority 50, extra jobs to 10."),
    ("examples",
     "1. run account N twice a day, never between 20:00 and 24:00, not on weekends => interval \
      hours 12, priority 51, first run 01:00, skip weekdays Sat Sun\n\
      2. run account N as soon as possible => temporary priority 99\n\
      3. keep account N out of the way of the others => temporary priority 49\n\
      4. don't run account N => skip every weekday\n\
      5. run account N two days from now => change allowed from\n\
      6. keep account N's extra jobs from delaying daily ones => extra priority 10\n\
      7. account N's extra jobs are urgent => daily priority 99, extra priority 98"),
];

pub fn print_guide(tty: bool) -> Result<()> {
    for (title, body) in GUIDE {
        pretty_line(&format!("{}\n", title), &format!("{}\n\n", body), tty)?;
    }
    Ok(())
}

/// prints the descriptor table
pub fn print_fields(tty: bool) -> Result<()> {
    pretty_line(&format!("{}{}{}{}{}\n",
                         format_field("key", 30, false),
                         format_field("kind", 10, false),
                         format_field("section", 17, false),
                         format_field("gate", 13, false),
                         "default"),
                "",
                tty)?;
    for spec in PLAIN_FIELDS {
        let default = Profile::default().plain_value(spec.key).map(|v| v.to_string()).unwrap_or_default();
        println!("{}{}{}{}{}",
                 format_field(spec.key, 30, false),
                 format_field(spec.kind.name(), 10, false),
                 format_field("plain", 17, false),
                 format_field("", 13, false),
                 default);
    }
    let defaults = crate::profile::Settings::default();
    for spec in SETTINGS_FIELDS {
        let default = defaults.value(spec.key).map(|v| v.to_string()).unwrap_or_default();
        println!("{}{}{}{}{}",
                 format_field(spec.key, 30, false),
                 format_field(spec.kind.name(), 10, false),
                 format_field(&spec.section.to_string(), 17, false),
                 format_field(spec.gate.unwrap_or(""), 13, false),
                 default);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPrefs;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn store() -> ProfileStore<MemoryPrefs> {
        ProfileStore::restore(MemoryPrefs::default())
    }

    fn row<'a>(rows: &'a [Row], key: &str) -> Option<&'a Row> {
        rows.iter().find(|r| r.key == key)
    }

    #[test]
    fn full_account_view_has_plain_fields_and_all_settings() {
        let s = store();
        let p = &s.list()[2];
        let rows = rows(p, Role::Account, &s.base(), &s.override_profile(), View::Full, today());
        assert_eq!(rows[0].key, "username");
        assert!(row(&rows, "note").is_some());
        assert!(row(&rows, "fight").is_some());
        let priority = row(&rows, "priority").unwrap();
        assert_eq!(priority.tier, Some(Tier::Inherited));
        assert_eq!(priority.flag, Some(false));
        assert!(!priority.editable);
    }

    #[test]
    fn lite_view_hides_inherited_fields() {
        let mut s = store();
        let id = s.list()[2].id.clone();
        set_override(&mut s, &id, "priority", true).unwrap();
        let p = s.get(&id).unwrap();
        let rows = rows(p, Role::Account, &s.base(), &s.override_profile(), View::Lite, today());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "priority");
        assert_eq!(rows[0].tier, Some(Tier::Account));
    }

    #[test]
    fn reserved_slots_have_no_plain_rows() {
        let s = store();
        let base = s.base();
        let rows = rows(&base, Role::Base, &base, &s.override_profile(), View::Full, today());
        assert!(row(&rows, "username").is_none());
        assert!(rows.iter().all(|r| r.flag.is_none() && r.editable));
        assert_eq!(rows.len(), SETTINGS_FIELDS.len());
    }

    #[test]
    fn forced_field_is_marked_and_locked() {
        let mut s = store();
        set_field(&mut s, "override", "crontab_step", "6").unwrap();
        set_override(&mut s, "override", "crontab_step", true).unwrap();
        let p = &s.list()[3];
        let rows = rows(p, Role::Account, &s.base(), &s.override_profile(), View::Lite, today());
        let step = row(&rows, "crontab_step").unwrap();
        assert_eq!(step.value, "6");
        assert_eq!(step.flag, Some(true));
        assert!(!step.flag_toggleable);
        assert_eq!(step.line().0, format!("[#] {}", format_field("interval hours", LABEL_WIDTH, true)));
        assert_eq!(step.line().1, "6  (forced)\n");
    }

    #[test]
    fn edits_follow_resolution_rules() {
        let mut s = store();
        // inherited value can't be edited until the flag is on
        assert!(set_field(&mut s, "1", "priority", "70").is_err());
        set_override(&mut s, "1", "priority", true).unwrap();
        set_field(&mut s, "1", "priority", "70").unwrap();
        assert_eq!(s.select("1").unwrap().settings.priority, "70");

        // forcing from the override slot locks both value and flag
        set_override(&mut s, "override", "priority", true).unwrap();
        assert!(set_field(&mut s, "1", "priority", "71").is_err());
        assert!(set_override(&mut s, "1", "priority", false).is_err());

        // base values are always editable but have no flags
        set_field(&mut s, "base", "job_mail", "off").unwrap();
        assert!(!s.base().settings.job_mail);
        assert!(set_override(&mut s, "base", "job_mail", true).is_err());
    }

    #[test]
    fn plain_fields_only_on_accounts() {
        let mut s = store();
        set_field(&mut s, "2", "username", "doctor").unwrap();
        assert_eq!(s.select("2").unwrap().username, "doctor");
        assert!(set_field(&mut s, "base", "username", "x").is_err());
        assert!(set_field(&mut s, "2", "evaluating", "perhaps").is_err());
    }

    #[test]
    fn account_edits_never_reach_the_base_profile() {
        let mut s = store();
        assert!(!s.import_all("[{},{},{}]").unwrap());
        set_override(&mut s, "1", "priority", true).unwrap();
        set_field(&mut s, "1", "priority", "70").unwrap();
        assert_eq!(s.base().settings.priority, "50");
        assert_eq!(s.list()[2].settings.priority, "70");
    }

    #[test]
    fn login_is_one_update() {
        let mut s = store();
        let seen = std::rc::Rc::new(std::cell::Cell::new(0));
        let sink = std::rc::Rc::clone(&seen);
        s.subscribe(move |_| sink.set(sink.get() + 1));
        set_login(&mut s, "1", Some("doctor"), "secret").unwrap();
        let p = s.select("1").unwrap();
        assert_eq!((p.username.as_str(), p.password.as_str()), ("doctor", "secret"));
        assert_eq!(seen.get(), 1);

        set_login(&mut s, "1", None, "other").unwrap();
        assert_eq!(s.select("1").unwrap().username, "doctor");
        assert_eq!(s.select("1").unwrap().password, "other");

        assert!(set_login(&mut s, "base", Some("x"), "y").is_err());
        assert!(set_login(&mut s, "ghost", Some("x"), "y").is_err());
        assert_eq!(s.base().username, "");
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn toggle_input_is_validated() {
        let mut s = store();
        assert!(set_field(&mut s, "base", "job_dorm", "sometimes").is_err());
        assert!(set_field(&mut s, "base", "job_dorm", "off").is_ok());
        assert!(set_field(&mut s, "base", "nope", "1").is_err());
        assert!(set_field(&mut s, "ghost", "priority", "1").is_err());
    }

    #[test]
    fn pick_normalizes_choices() {
        let mut s = store();
        let stored = pick_choices(&mut s, "base", "forbid_weekday", &[6, 0, 6, 42]).unwrap();
        assert_eq!(stored, "0 6");
        assert_eq!(s.base().settings.forbid_weekday, "0 6");
        assert!(pick_choices(&mut s, "base", "priority", &[1]).is_err());
    }

    #[test]
    fn effective_json_is_flat() {
        let s = store();
        let p = &s.list()[2];
        let json = effective_json(p, Role::Account, &s.base(), &s.override_profile());
        assert_eq!(json["id"], Value::String(p.id.clone()));
        assert_eq!(json["priority"], "50");
        assert_eq!(json["job_mail"], true);
        assert!(json.get("priority_override").is_none());
    }

    #[test]
    fn header_shows_server_user_and_last_run() {
        let mut p = Profile::for_slot(2);
        p.username = "doctor".to_string();
        p.last_end_time = "05-01 12:00".to_string();
        let (note, line) = account_header(&p);
        assert_eq!(note, "1");
        assert_eq!(line, "官服 doctor  last run 05-01 12:00");
    }
}
