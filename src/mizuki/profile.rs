use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;
use crate::field::{FieldKind, FieldSpec, FieldType, FieldValue, PlainSpec, Section};
use crate::field::{DORM_ITEMS, RECRUIT_TIERS, WEEKDAYS};
use crate::specific_fail;

/// identity of the reserved base profile (slot 0)
pub static BASE_ID: &str = "before";
/// identity of the reserved override profile (slot 1)
pub static OVERRIDE_ID: &str = "after";

pub static SERVER_OFFICIAL: &str = "官服";
pub static SERVER_BILIBILI: &str = "B服";

/// Declares every overridable field once: the typed record, its defaults,
/// the descriptor table and key based accessors all come from this list.
macro_rules! overridable_settings {
    ($( $name:ident, $flag:ident : $ty:ident = $default:expr
        => $kind:expr, $section:ident, $label:expr, gate $gate:expr; )*) => {

        /// Values and per-field override flags of all overridable fields
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
        #[serde(default)]
        pub struct Settings {
            $( pub $name: $ty, pub $flag: bool, )*
        }

        impl Default for Settings {
            fn default() -> Self {
                Settings {
                    $( $name: $default.into(), $flag: false, )*
                }
            }
        }

        /// all overridable fields in editor order
        pub static SETTINGS_FIELDS: &[FieldSpec] = &[
            $( FieldSpec {
                key: stringify!($name),
                label: $label,
                kind: $kind,
                section: Section::$section,
                gate: $gate,
            }, )*
        ];

        impl Settings {
            pub fn value(&self, key: &str) -> Option<FieldValue> {
                match key {
                    $( stringify!($name) => Some(FieldValue::from(self.$name.clone())), )*
                    _ => None,
                }
            }

            pub fn overridden(&self, key: &str) -> Option<bool> {
                match key {
                    $( stringify!($name) => Some(self.$flag), )*
                    _ => None,
                }
            }

            pub fn set_value(&mut self, key: &str, value: FieldValue) -> Result<()> {
                match key {
                    $( stringify!($name) => match <$ty as FieldType>::from_field(value) {
                        Some(v) => {
                            self.$name = v;
                            Ok(())
                        }
                        None => specific_fail!(format!("field '{}' expects a {} value",
                                                       key, stringify!($ty))),
                    }, )*
                    _ => specific_fail!(format!("unknown field '{}'", key)),
                }
            }

            pub fn set_overridden(&mut self, key: &str, on: bool) -> Result<()> {
                match key {
                    $( stringify!($name) => {
                        self.$flag = on;
                        Ok(())
                    } )*
                    _ => specific_fail!(format!("unknown field '{}'", key)),
                }
            }
        }
    };
}

overridable_settings! {
    priority, priority_override: String = "50"
        => FieldKind::Text, Schedule, "priority", gate None;
    allow_begin_date, allow_begin_date_override: String = ""
        => FieldKind::Date, Schedule, "allowed from", gate None;
    allow_end_datetime, allow_end_datetime_override: String = ""
        => FieldKind::Text, Schedule, "allowed until", gate None;
    forbid_weekday, forbid_weekday_override: String = ""
        => FieldKind::Choice(WEEKDAYS), Schedule, "skip weekdays", gate None;
    crontab_start, crontab_start_override: String = "04:00"
        => FieldKind::Text, Schedule, "first run", gate None;
    crontab_step, crontab_step_override: String = "8"
        => FieldKind::Text, Schedule, "interval hours", gate None;

    job_mail, job_mail_override: bool = true
        => FieldKind::Toggle, Daily, "mail", gate None;
    job_fight, job_fight_override: bool = true
        => FieldKind::Toggle, Daily, "combat", gate None;
    fight, fight_override: String = "jm hd ce ls"
        => FieldKind::Fight, Daily, "combat target", gate Some("job_fight");
    max_stone, max_stone_override: String = "0"
        => FieldKind::Text, Daily, "stone uses", gate Some("job_fight");
    max_drug, max_drug_override: String = "0"
        => FieldKind::Text, Daily, "potion uses", gate Some("job_fight");
    max_drug_day, max_drug_day_override: String = "1 0 1 1 1 2 3 99"
        => FieldKind::DrugDay, Daily, "expiring potions", gate Some("job_fight");
    fight_activity_shop, fight_activity_shop_override: bool = true
        => FieldKind::Toggle, Daily, "event shop", gate Some("job_fight");
    job_dorm, job_dorm_override: bool = true
        => FieldKind::Toggle, Daily, "base", gate None;
    job_dorm_item, job_dorm_item_override: String = "0 1 2 3 4 5 6 7 8 9"
        => FieldKind::Choice(DORM_ITEMS), Daily, "base chores", gate Some("job_dorm");
    give_away_all_clue, give_away_all_clue_override: bool = false
        => FieldKind::Toggle, Daily, "give away clues", gate Some("job_dorm");
    job_shop, job_shop_override: bool = true
        => FieldKind::Toggle, Daily, "credit shop", gate None;
    prefer_goods, prefer_goods_override: String = ""
        => FieldKind::Text, Daily, "buy first", gate Some("job_shop");
    forbid_goods, forbid_goods_override: String = ""
        => FieldKind::Text, Daily, "never buy", gate Some("job_shop");
    job_recruit, job_recruit_override: bool = true
        => FieldKind::Toggle, Daily, "recruit", gate None;
    auto_recruit, auto_recruit_override: String = "0 1 2 3 4 5 6 7 8 9"
        => FieldKind::Choice(RECRUIT_TIERS), Daily, "recruit choices", gate Some("job_recruit");
    job_task, job_task_override: bool = true
        => FieldKind::Toggle, Daily, "missions", gate None;
    job_activity_checkin, job_activity_checkin_override: bool = true
        => FieldKind::Toggle, Daily, "check-in", gate None;
    job_activity_recruit, job_activity_recruit_override: bool = true
        => FieldKind::Toggle, Daily, "free pulls", gate None;

    fight_pass, fight_pass_override: String = ""
        => FieldKind::Fight, Extra, "stage clearing", gate None;

    fight_max_failed_times, fight_max_failed_times_override: String = "2"
        => FieldKind::Text, FaultTolerance, "skip stage after failures", gate None;
    login_max_see_times, login_max_see_times_override: String = "3"
        => FieldKind::Text, FaultTolerance, "skip login after attempts", gate None;
    captcha_username, captcha_username_override: String = ""
        => FieldKind::Text, FaultTolerance, "captcha account", gate None;
    captcha_password, captcha_password_override: String = ""
        => FieldKind::Text, FaultTolerance, "captcha password", gate None;
}

/// fields edited directly, never inherited
pub static PLAIN_FIELDS: &[PlainSpec] = &[
    PlainSpec { key: "username", label: "account", kind: FieldKind::Text },
    PlainSpec { key: "password", label: "password", kind: FieldKind::Text },
    PlainSpec { key: "server", label: "server", kind: FieldKind::Text },
    PlainSpec { key: "evaluating", label: "verifying", kind: FieldKind::Toggle },
    PlainSpec { key: "note", label: "note", kind: FieldKind::Text },
];

/// descriptor of an overridable field
pub fn field_spec(key: &str) -> Option<&'static FieldSpec> {
    SETTINGS_FIELDS.iter().find(|f| f.key == key)
}

/// descriptor of a plain field
pub fn plain_spec(key: &str) -> Option<&'static PlainSpec> {
    PLAIN_FIELDS.iter().find(|f| f.key == key)
}

/// whether `key` is a field of the serialized profile record
pub fn is_profile_key(key: &str) -> bool {
    if key == "id" || key == "lastEndTime" || plain_spec(key).is_some() || field_spec(key).is_some() {
        return true;
    }
    key.strip_suffix("_override").map_or(false, |k| field_spec(k).is_some())
}

/// One account configuration record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub password: String,
    pub server: String,
    pub evaluating: bool,
    pub note: String,
    #[serde(flatten)]
    pub settings: Settings,
    /// written by the execution engine
    #[serde(rename = "lastEndTime")]
    pub last_end_time: String,
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            id: String::new(),
            username: String::new(),
            password: String::new(),
            server: SERVER_OFFICIAL.to_string(),
            evaluating: false,
            note: String::new(),
            settings: Settings::default(),
            last_end_time: String::new(),
        }
    }
}

impl Profile {
    /// default profile for a list position: the two reserved slots get
    /// fixed identities, every other slot a fresh one
    pub fn for_slot(slot: usize) -> Profile {
        let (id, note) = match slot {
            0 => (BASE_ID.to_string(), "基础设置".to_string()),
            1 => (OVERRIDE_ID.to_string(), "覆盖设置".to_string()),
            n => (Uuid::new_v4().to_string(), (n - 1).to_string()),
        };
        Profile {
            id,
            note,
            ..Default::default()
        }
    }

    pub fn plain_value(&self, key: &str) -> Option<FieldValue> {
        match key {
            "username" => Some(FieldValue::from(self.username.clone())),
            "password" => Some(FieldValue::from(self.password.clone())),
            "server" => Some(FieldValue::from(self.server.clone())),
            "evaluating" => Some(FieldValue::from(self.evaluating)),
            "note" => Some(FieldValue::from(self.note.clone())),
            _ => None,
        }
    }

    pub fn set_plain(&mut self, key: &str, value: FieldValue) -> Result<()> {
        let slot = match (key, value) {
            ("evaluating", FieldValue::Flag(b)) => {
                self.evaluating = b;
                return Ok(());
            }
            ("username", FieldValue::Text(s)) => (&mut self.username, s),
            ("password", FieldValue::Text(s)) => (&mut self.password, s),
            ("server", FieldValue::Text(s)) => (&mut self.server, s),
            ("note", FieldValue::Text(s)) => (&mut self.note, s),
            (k, _) if plain_spec(k).is_some() => {
                return specific_fail!(format!("field '{}' got a value of the wrong kind", k))
            }
            (k, _) => return specific_fail!(format!("unknown field '{}'", k)),
        };
        *slot.0 = slot.1;
        Ok(())
    }

    /// switches between the two game servers
    pub fn toggle_server(&mut self) {
        self.server = if self.server == SERVER_BILIBILI {
            SERVER_OFFICIAL.to_string()
        } else {
            SERVER_BILIBILI.to_string()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_slots_have_fixed_identities() {
        let base = Profile::for_slot(0);
        let over = Profile::for_slot(1);
        assert_eq!(base.id, BASE_ID);
        assert_eq!(over.id, OVERRIDE_ID);
        assert_eq!(base.note, "基础设置");
        assert_eq!(over.note, "覆盖设置");
    }

    #[test]
    fn account_slots_are_numbered_and_unique() {
        let a = Profile::for_slot(2);
        let b = Profile::for_slot(2);
        assert_eq!(a.note, "1");
        assert_ne!(a.id, b.id);
        assert_eq!(Profile::for_slot(5).note, "4");
    }

    #[test]
    fn missing_keys_take_defaults() {
        let p: Profile = serde_json::from_str(r#"{"id":"x","priority":"70"}"#).unwrap();
        assert_eq!(p.id, "x");
        assert_eq!(p.server, SERVER_OFFICIAL);
        assert_eq!(p.settings.priority, "70");
        assert_eq!(p.settings.crontab_start, "04:00");
        assert!(p.settings.job_mail);
        assert!(!p.settings.priority_override);
    }

    #[test]
    fn wrong_json_type_is_rejected() {
        assert!(serde_json::from_str::<Profile>(r#"{"priority":50}"#).is_err());
        assert!(serde_json::from_str::<Profile>(r#"{"job_mail":"yes"}"#).is_err());
        assert!(serde_json::from_str::<Profile>(r#"{"id":7}"#).is_err());
    }

    #[test]
    fn serialized_keys_are_flat() {
        let json = serde_json::to_value(Profile::for_slot(0)).unwrap();
        assert_eq!(json["id"], "before");
        assert_eq!(json["priority"], "50");
        assert_eq!(json["priority_override"], false);
        assert_eq!(json["lastEndTime"], "");
        assert_eq!(json["max_drug_day"], "1 0 1 1 1 2 3 99");
    }

    #[test]
    fn key_accessors_cover_the_table() {
        let mut s = Settings::default();
        for spec in SETTINGS_FIELDS {
            assert!(s.value(spec.key).is_some(), "{}", spec.key);
            assert_eq!(s.overridden(spec.key), Some(false));
            s.set_overridden(spec.key, true).unwrap();
            assert_eq!(s.overridden(spec.key), Some(true));
        }
        assert!(s.value("nope").is_none());
    }

    #[test]
    fn set_value_checks_the_kind() {
        let mut s = Settings::default();
        s.set_value("priority", FieldValue::from("99")).unwrap();
        assert_eq!(s.priority, "99");
        s.set_value("job_dorm", FieldValue::Flag(false)).unwrap();
        assert!(!s.job_dorm);
        assert!(s.set_value("job_dorm", FieldValue::from("off")).is_err());
        assert!(s.set_value("missing", FieldValue::from("1")).is_err());
    }

    #[test]
    fn gates_point_at_toggles() {
        for spec in SETTINGS_FIELDS {
            if let Some(gate) = spec.gate {
                let gate_spec = field_spec(gate).unwrap();
                assert_eq!(gate_spec.kind, FieldKind::Toggle);
                assert!(gate_spec.gate.is_none());
            }
        }
    }

    #[test]
    fn plain_fields_round_through_accessors() {
        let mut p = Profile::default();
        p.set_plain("username", FieldValue::from("doctor")).unwrap();
        p.set_plain("evaluating", FieldValue::Flag(true)).unwrap();
        assert_eq!(p.plain_value("username"), Some(FieldValue::from("doctor")));
        assert!(p.evaluating);
        assert!(p.set_plain("note", FieldValue::Flag(true)).is_err());
        assert!(p.set_plain("priority", FieldValue::from("1")).is_err());
    }

    #[test]
    fn server_toggles_between_two_values() {
        let mut p = Profile::default();
        p.toggle_server();
        assert_eq!(p.server, SERVER_BILIBILI);
        p.toggle_server();
        assert_eq!(p.server, SERVER_OFFICIAL);
    }
}
