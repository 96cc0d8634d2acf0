//! Three-tier field resolution.
//!
//! Every overridable field of an account is resolved from three records: the
//! base profile (slot 0), the override profile (slot 1) and the account
//! itself. Precedence, highest first: a flag set on the override profile, the
//! account's own flag, the base value.
//!
//! Everything here is a pure function of its inputs.

use log::debug;

use crate::field::{FieldSpec, FieldValue};
use crate::profile::{Profile, Settings, SETTINGS_FIELDS};

/// What a profile is, decided by its list position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Base,
    Override,
    Account,
}

impl Role {
    pub fn of_slot(slot: usize) -> Role {
        match slot {
            0 => Role::Base,
            1 => Role::Override,
            _ => Role::Account,
        }
    }
}

/// Full editor or the compact ("lite") one used in the account list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Full,
    Lite,
}

/// Which record the effective value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    /// editing a reserved slot, its own value is shown
    Own,
    /// forced by the override profile
    Forced,
    /// the account overrides the base value
    Account,
    /// inherited from the base profile
    Inherited,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution<T> {
    pub value: T,
    pub tier: Tier,
    /// the value itself may be edited
    pub editable: bool,
    /// the per-field flag may be flipped
    pub flag_toggleable: bool,
    /// rendered in the requested view
    pub visible: bool,
}

/// Resolves one field.
///
/// `current_flag` is the edited profile's own flag and `override_flag` the
/// override profile's flag for the same field.
pub fn resolve<T: Clone>(role: Role,
                         view: View,
                         base: &T,
                         current: &T,
                         over: &T,
                         current_flag: bool,
                         override_flag: bool)
                         -> Resolution<T> {
    match role {
        Role::Base => Resolution {
            value: current.clone(),
            tier: Tier::Own,
            editable: true,
            flag_toggleable: false,
            visible: true,
        },
        // the override slot's flag means "force onto every account"
        Role::Override => Resolution {
            value: current.clone(),
            tier: Tier::Own,
            editable: true,
            flag_toggleable: true,
            visible: true,
        },
        Role::Account if override_flag => Resolution {
            value: over.clone(),
            tier: Tier::Forced,
            editable: false,
            flag_toggleable: false,
            visible: true,
        },
        Role::Account if !current_flag => Resolution {
            value: base.clone(),
            tier: Tier::Inherited,
            editable: false,
            flag_toggleable: true,
            visible: view == View::Full,
        },
        Role::Account => Resolution {
            value: current.clone(),
            tier: Tier::Account,
            editable: true,
            flag_toggleable: true,
            visible: true,
        },
    }
}

/// Resolves the field described by `spec` for `current`.
pub fn resolve_field(spec: &FieldSpec,
                     role: Role,
                     view: View,
                     current: &Settings,
                     base: &Settings,
                     over: &Settings)
                     -> Option<Resolution<FieldValue>> {
    let value = current.value(spec.key)?;
    Some(resolve(role,
                 view,
                 &base.value(spec.key)?,
                 &value,
                 &over.value(spec.key)?,
                 current.overridden(spec.key)?,
                 over.overridden(spec.key)?))
}

/// Whether fields gated by a toggle are shown. The reserved slots always
/// show them so they can be configured; accounts only when the gate
/// resolves to `on`.
pub fn gate_open(role: Role, gate: &Resolution<FieldValue>) -> bool {
    match role {
        Role::Base | Role::Override => true,
        Role::Account => gate.value == FieldValue::Flag(true),
    }
}

/// Visibility of a field including its gate, if any.
pub fn field_shown(spec: &FieldSpec,
                   role: Role,
                   view: View,
                   current: &Settings,
                   base: &Settings,
                   over: &Settings)
                   -> bool {
    let own = match resolve_field(spec, role, view, current, base, over) {
        Some(r) => r.visible,
        None => return false,
    };
    own && match spec.gate.and_then(crate::profile::field_spec) {
        Some(gate) => resolve_field(gate, role, View::Full, current, base, over)
            .map_or(false, |r| gate_open(role, &r)),
        None => true,
    }
}

/// Every overridable field folded to its effective value, i.e. the settings
/// an account actually runs with. All flags in the result are cleared.
pub fn effective_settings(role: Role, current: &Profile, base: &Profile, over: &Profile) -> Settings {
    let mut out = Settings::default();
    for spec in SETTINGS_FIELDS {
        if let Some(r) = resolve_field(spec,
                                       role,
                                       View::Full,
                                       &current.settings,
                                       &base.settings,
                                       &over.settings) {
            if let Err(e) = out.set_value(spec.key, r.value) {
                debug!("effective value of {} skipped: {}", spec.key, e);
            }
        }
    }
    out
}
