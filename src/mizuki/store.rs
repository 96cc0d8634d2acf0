use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::errors::Result;
use crate::profile::{is_profile_key, Profile};
use crate::resolve::Role;
use crate::specific_fail;

/// preferences key holding the whole profile list
pub static PREFS_KEY: &str = "account";
/// profiles created when nothing usable is stored: base, override and four accounts
pub const DEFAULT_PROFILE_COUNT: usize = 6;
/// file name of the preferences inside the store folder
pub static PREFS_FILE: &str = "prefs.json";

/// Small string key-value storage the profile list is persisted into
pub trait Preferences {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Preferences kept in memory only
#[derive(Default, Debug, Clone)]
pub struct MemoryPrefs {
    values: BTreeMap<String, String>,
}

impl Preferences for MemoryPrefs {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences stored as a JSON object in a single file
#[derive(Debug, Clone)]
pub struct PrefsFile {
    path: PathBuf,
}

impl PrefsFile {
    pub fn new<P: AsRef<Path>>(path: P) -> PrefsFile {
        PrefsFile { path: path.as_ref().to_path_buf() }
    }

    /// preferences file inside a store folder
    pub fn in_folder<P: AsRef<Path>>(folder: P) -> PrefsFile {
        PrefsFile::new(folder.as_ref().join(PREFS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        if !self.path.is_file() {
            return specific_fail!(format!("{} is not a file.", self.path.display()));
        }
        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl Preferences for PrefsFile {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        // a corrupt file is replaced rather than blocking every save
        let mut all = self.read_all().unwrap_or_else(|e| {
            warn!("discarding unreadable preferences {}: {}", self.path.display(), e);
            BTreeMap::new()
        });
        all.insert(key.to_string(), value.to_string());
        let folder = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        create_dir_all(&folder)?;
        write_atomically(&folder, &self.path, serde_json::to_string_pretty(&all)?.as_bytes())
    }
}

/// writes through a temp file in `folder` so `path` is either old or new, never partial
fn write_atomically(folder: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(folder)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

type Subscriber = Box<dyn FnMut(&[Profile])>;

/// Ordered collection of profiles: base, override, then accounts
pub struct ProfileStore<P: Preferences> {
    prefs: P,
    profiles: Vec<Profile>,
    subscribers: Vec<Subscriber>,
}

/// the list used when nothing usable is stored
pub fn default_profiles() -> Vec<Profile> {
    (0..DEFAULT_PROFILE_COUNT).map(Profile::for_slot).collect()
}

/// parses a serialized profile list, the import and storage format.
/// Unknown keys and repeated identities make the whole list invalid.
pub fn decode(content: &str) -> Result<Vec<Profile>> {
    let records: Vec<Map<String, Value>> = serde_json::from_str(content)?;
    let mut seen = HashSet::new();
    let mut profiles = Vec::with_capacity(records.len());
    for (n, record) in records.into_iter().enumerate() {
        if let Some(key) = record.keys().find(|k| !is_profile_key(k)) {
            return specific_fail!(format!("profile {} has unknown field '{}'", n, key));
        }
        let profile: Profile = serde_json::from_value(Value::Object(record))?;
        if !seen.insert(profile.id.clone()) {
            return specific_fail!(format!("profile {} repeats identity '{}'", n, profile.id));
        }
        profiles.push(profile);
    }
    Ok(profiles)
}

impl<P: Preferences> ProfileStore<P> {
    /// loads the stored list, falling back to the default profiles when
    /// nothing is stored or the stored content can't be read
    pub fn restore(prefs: P) -> ProfileStore<P> {
        let profiles = match prefs.get(PREFS_KEY) {
            Ok(Some(content)) => match decode(&content) {
                Ok(list) => {
                    info!("restored {} profiles", list.len());
                    list
                }
                Err(e) => {
                    warn!("stored profiles are unreadable, using defaults: {}", e);
                    default_profiles()
                }
            },
            Ok(None) => {
                info!("no stored profiles, using defaults");
                default_profiles()
            }
            Err(e) => {
                warn!("failed to read preferences, using defaults: {}", e);
                default_profiles()
            }
        };
        ProfileStore {
            prefs,
            profiles,
            subscribers: Vec::new(),
        }
    }

    pub fn list(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    /// profile in slot 0, or its default if the list is shorter
    pub fn base(&self) -> Cow<'_, Profile> {
        self.slot_or_default(0)
    }

    /// profile in slot 1, or its default if the list is shorter
    pub fn override_profile(&self) -> Cow<'_, Profile> {
        self.slot_or_default(1)
    }

    fn slot_or_default(&self, slot: usize) -> Cow<'_, Profile> {
        match self.profiles.get(slot) {
            Some(p) => Cow::Borrowed(p),
            None => Cow::Owned(Profile::for_slot(slot)),
        }
    }

    /// number of ordinary account profiles
    pub fn account_count(&self) -> usize {
        self.profiles.len().saturating_sub(2)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn role_of(&self, id: &str) -> Option<Role> {
        self.position(id).map(Role::of_slot)
    }

    /// finds a profile by identity, by `base`/`override` (or their stored
    /// identities) or by 1-based account number
    pub fn select(&self, selector: &str) -> Option<&Profile> {
        if let Some(p) = self.get(selector) {
            return Some(p);
        }
        let slot = match selector {
            "base" => 0,
            "override" => 1,
            s => match s.parse::<usize>() {
                Ok(n) if n >= 1 => n + 1,
                _ => return None,
            },
        };
        self.profiles.get(slot)
    }

    /// appends a fresh account and returns the new account count
    pub fn add_account(&mut self) -> Result<usize> {
        while self.profiles.len() < 2 {
            let reserved = Profile::for_slot(self.profiles.len());
            self.profiles.push(reserved);
        }
        let mut account = Profile::for_slot(self.profiles.len());
        while self.get(&account.id).is_some() {
            account = Profile::for_slot(self.profiles.len());
        }
        debug!("adding account {}", account.id);
        self.profiles.push(account);
        self.changed()?;
        Ok(self.account_count())
    }

    /// replaces the profile with identity `id` by `mutator(current)`.
    /// The identity can't be changed. Returns false when nothing matched.
    pub fn update<F>(&mut self, id: &str, mutator: F) -> Result<bool>
        where F: FnOnce(&Profile) -> Profile
    {
        let pos = match self.position(id) {
            Some(pos) => pos,
            None => {
                debug!("update of unknown profile {} ignored", id);
                return Ok(false);
            }
        };
        let mut next = mutator(&self.profiles[pos]);
        next.id = self.profiles[pos].id.clone();
        if next != self.profiles[pos] {
            debug!("updating profile {}", id);
            self.profiles[pos] = next;
        }
        self.changed()?;
        Ok(true)
    }

    /// like `update`, for mutators that can fail; on failure nothing changes
    pub fn try_update<F>(&mut self, id: &str, mutator: F) -> Result<bool>
        where F: FnOnce(&mut Profile) -> Result<()>
    {
        let mut next = match self.get(id) {
            Some(p) => p.clone(),
            None => return Ok(false),
        };
        mutator(&mut next)?;
        self.update(id, move |_| next)
    }

    /// replaces the whole list when `content` is a valid profile list.
    /// Malformed content leaves the store untouched and returns false.
    pub fn import_all(&mut self, content: &str) -> Result<bool> {
        let list = match decode(content) {
            Ok(list) => list,
            Err(e) => {
                info!("import rejected: {}", e);
                return Ok(false);
            }
        };
        info!("imported {} profiles", list.len());
        self.profiles = list;
        self.changed()?;
        Ok(true)
    }

    /// the full ordered list in its exchange format
    pub fn export_all(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.profiles)?)
    }

    /// writes the export to `out`, reporting failure as `false`
    pub fn export_to<W: Write>(&self, out: &mut W) -> bool {
        let res = self.export_all().and_then(|bytes| {
            out.write_all(&bytes)?;
            out.flush()?;
            Ok(())
        });
        match res {
            Ok(()) => true,
            Err(e) => {
                error!("export failed: {}", e);
                false
            }
        }
    }

    /// exports to a file, leaving no partial file behind on failure
    pub fn export_file<Q: AsRef<Path>>(&self, path: Q) -> bool {
        let path = path.as_ref();
        let folder = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let res = self.export_all().and_then(|bytes| write_atomically(&folder, path, &bytes));
        match res {
            Ok(()) => {
                info!("exported {} profiles to {}", self.profiles.len(), path.display());
                true
            }
            Err(e) => {
                error!("export to {} failed: {}", path.display(), e);
                false
            }
        }
    }

    /// reads an import file; unreadable files count as malformed input
    pub fn import_file<Q: AsRef<Path>>(&mut self, path: Q) -> Result<bool> {
        match fs::read(path.as_ref()) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => self.import_all(&content),
                Err(_) => {
                    info!("import rejected: {} is not UTF-8", path.as_ref().display());
                    Ok(false)
                }
            },
            Err(e) => {
                info!("import rejected: {}: {}", path.as_ref().display(), e);
                Ok(false)
            }
        }
    }

    /// writes the current list to the preferences
    pub fn persist(&mut self) -> Result<()> {
        let content = serde_json::to_string(&self.profiles)?;
        self.prefs.put(PREFS_KEY, &content).map_err(|e| {
            error!("failed to persist profiles: {}", e);
            e
        })
    }

    /// `f` is called with the full list after every change
    pub fn subscribe<F>(&mut self, f: F)
        where F: FnMut(&[Profile]) + 'static
    {
        self.subscribers.push(Box::new(f));
    }

    fn changed(&mut self) -> Result<()> {
        for s in self.subscribers.iter_mut() {
            s(&self.profiles);
        }
        self.persist()
    }
}

/// makes sure the store folder exists
pub fn ensure_folder(folder: &Path) -> Result<()> {
    if folder.is_dir() {
        return Ok(());
    }
    if folder.exists() {
        return specific_fail!(format!("{} is not a directory.", folder.display()));
    }
    create_dir_all(folder)?;
    Ok(())
}
