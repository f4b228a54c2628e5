//! AnnotationStore – public and private markers and town labels.
//!
//! Public collections come from the static resources and only change in
//! memory; the single write path back to the site is [`AnnotationStore::export_public`].
//! Private collections are written through to the [`KeyValueStore`] on every
//! mutation. Every mutation is staged first, so a failed write leaves memory
//! untouched.

use crate::config::ResourceConfig;
use crate::error::{Result, ViewerError};
use crate::protocol::{self, MarkerRecord, TownRecord};
use crate::source::ResourceSource;
use crate::storage::KeyValueStore;
use crate::types::{
    AnnotationId, AnnotationKind, AnnotationMatcher, MapPoint, Marker, MarkerKind, Scope,
    TownLabel,
};
use log::{debug, info, warn};

// ---------------------------------------------------------------------------
// Shared annotation behaviour
// ---------------------------------------------------------------------------

trait Annotation: Clone {
    fn id(&self) -> AnnotationId;
    fn position(&self) -> &MapPoint;
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
}

impl Annotation for Marker {
    fn id(&self) -> AnnotationId {
        self.id
    }
    fn position(&self) -> &MapPoint {
        &self.position
    }
    fn name(&self) -> &str {
        &self.label
    }
    fn set_name(&mut self, name: String) {
        self.label = name;
    }
}

impl Annotation for TownLabel {
    fn id(&self) -> AnnotationId {
        self.id
    }
    fn position(&self) -> &MapPoint {
        &self.position
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

fn is_match<T: Annotation>(matcher: &AnnotationMatcher, item: &T) -> bool {
    matcher.matches(item.id(), item.position(), item.name())
}

/// Split `items` into (kept, removed).
fn partition<T: Annotation>(items: &[T], matcher: &AnnotationMatcher) -> (Vec<T>, Vec<T>) {
    items.iter().cloned().partition(|i| !is_match(matcher, i))
}

/// Copy of `items` with `apply` run on every match, plus the updated entries.
fn updated<T: Annotation>(
    items: &[T],
    matcher: &AnnotationMatcher,
    apply: impl Fn(&mut T),
) -> (Vec<T>, Vec<T>) {
    let mut changed = Vec::new();
    let all = items
        .iter()
        .cloned()
        .map(|mut i| {
            if is_match(matcher, &i) {
                apply(&mut i);
                changed.push(i.clone());
            }
            i
        })
        .collect();
    (all, changed)
}

fn validated_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ViewerError::MalformedInput("name must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// AnnotationStore
// ---------------------------------------------------------------------------

pub struct AnnotationStore<S: KeyValueStore> {
    storage: S,
    resources: ResourceConfig,
    public_markers: Vec<Marker>,
    private_markers: Vec<Marker>,
    public_towns: Vec<TownLabel>,
    private_towns: Vec<TownLabel>,
    next_id: u64,
}

impl<S: KeyValueStore> AnnotationStore<S> {
    /// Create a store and read the private collections from `storage`.
    pub fn new(storage: S, resources: ResourceConfig) -> Self {
        let mut store = Self {
            storage,
            resources,
            public_markers: Vec::new(),
            private_markers: Vec::new(),
            public_towns: Vec::new(),
            private_towns: Vec::new(),
            next_id: 1,
        };
        store.load_private();
        store
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Read both private collections. Missing or malformed data loads as empty.
    pub fn load_private(&mut self) {
        let markers = self
            .read_private(&self.resources.private_markers_key.clone(), |key, json| {
                protocol::parse_marker_records(key, json)
            })
            .into_iter()
            .filter_map(|r| {
                let name = r.name.clone();
                match r.into_marker(AnnotationId(0)) {
                    Ok(m) => Some(m),
                    Err(e) => {
                        warn!("Dropping stored marker '{}': {}", name, e);
                        None
                    }
                }
            })
            .collect::<Vec<_>>();
        self.private_markers = markers
            .into_iter()
            .map(|m| Marker {
                id: self.allocate_id(),
                ..m
            })
            .collect();

        let towns = self.read_private(&self.resources.private_towns_key.clone(), |key, json| {
            protocol::parse_town_records(key, json)
        });
        self.private_towns = towns
            .into_iter()
            .map(|r| TownLabel {
                id: self.allocate_id(),
                position: r.latlng.into(),
                name: r.name,
            })
            .collect();

        debug!(
            "Loaded {} private markers, {} private towns",
            self.private_markers.len(),
            self.private_towns.len()
        );
    }

    fn read_private<R>(&self, key: &str, parse: impl Fn(&str, &str) -> Result<Vec<R>>) -> Vec<R> {
        let raw = match self.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read '{}' from storage: {}", key, e);
                return Vec::new();
            }
        };
        parse(key, &raw).unwrap_or_else(|e| {
            warn!("Stored '{}' is malformed, treating as empty: {}", key, e);
            Vec::new()
        })
    }

    /// Fetch and apply one public resource. Failures leave the collection as
    /// it was and are only logged. Returns the number of entries added.
    pub async fn load_public<R: ResourceSource + ?Sized>(
        &mut self,
        source: &R,
        kind: AnnotationKind,
    ) -> usize {
        let resource = self.resources.public_resource(kind).to_string();
        match source.fetch(&resource).await {
            Ok(body) => self.apply_public(kind, &body),
            Err(e) => {
                info!("No public {} available: {}", kind, e);
                0
            }
        }
    }

    /// Apply a fetched public resource body. Returns the number added.
    pub fn apply_public(&mut self, kind: AnnotationKind, body: &str) -> usize {
        match kind {
            AnnotationKind::Markers => self.apply_public_markers(body).len(),
            AnnotationKind::Towns => self.apply_public_towns(body).len(),
        }
    }

    /// Merge public marker records into memory, skipping entries identical to
    /// one present before this call. Repeats within `body` are all kept.
    /// Returns the newly added markers.
    pub fn apply_public_markers(&mut self, body: &str) -> Vec<Marker> {
        let source = self.resources.public_markers.clone();
        let records = match protocol::parse_marker_records(&source, body) {
            Ok(r) => r,
            Err(e) => {
                warn!("Public resource '{}' is malformed: {}", source, e);
                return Vec::new();
            }
        };

        let existing = self.public_markers.len();
        let mut added = Vec::new();
        for record in records {
            let name = record.name.clone();
            let marker = match record.into_marker(AnnotationId(0)) {
                Ok(m) => m,
                Err(e) => {
                    warn!("Skipping public marker '{}': {}", name, e);
                    continue;
                }
            };
            let duplicate = self.public_markers[..existing].iter().any(|m| {
                m.position == marker.position && m.kind == marker.kind && m.label == marker.label
            });
            if duplicate {
                debug!("Public marker '{}' already present", marker.label);
                continue;
            }
            let marker = Marker {
                id: self.allocate_id(),
                ..marker
            };
            self.public_markers.push(marker.clone());
            added.push(marker);
        }

        info!("Loaded {} public markers from '{}'", added.len(), source);
        added
    }

    /// Town counterpart of [`Self::apply_public_markers`].
    pub fn apply_public_towns(&mut self, body: &str) -> Vec<TownLabel> {
        let source = self.resources.public_towns.clone();
        let records = match protocol::parse_town_records(&source, body) {
            Ok(r) => r,
            Err(e) => {
                warn!("Public resource '{}' is malformed: {}", source, e);
                return Vec::new();
            }
        };

        let existing = self.public_towns.len();
        let mut added = Vec::new();
        for record in records {
            let position: MapPoint = record.latlng.into();
            let duplicate = self.public_towns[..existing]
                .iter()
                .any(|t| t.position == position && t.name == record.name);
            if duplicate {
                continue;
            }
            let town = TownLabel {
                id: self.allocate_id(),
                position,
                name: record.name,
            };
            self.public_towns.push(town.clone());
            added.push(town);
        }

        info!("Loaded {} public towns from '{}'", added.len(), source);
        added
    }

    /// Drop public collections and re-read private ones.
    pub fn reset(&mut self) {
        self.public_markers.clear();
        self.public_towns.clear();
        self.load_private();
    }

    // -----------------------------------------------------------------------
    // Markers
    // -----------------------------------------------------------------------

    /// Validate and append a marker. `kind` must name one of the fixed kinds.
    pub fn add_marker(
        &mut self,
        position: MapPoint,
        kind: &str,
        label: &str,
        scope: Scope,
    ) -> Result<Marker> {
        let kind: MarkerKind = kind.parse()?;
        self.insert_marker(position, kind, label, scope)
    }

    pub fn insert_marker(
        &mut self,
        position: MapPoint,
        kind: MarkerKind,
        label: &str,
        scope: Scope,
    ) -> Result<Marker> {
        let label = validated_name(label)?;
        let marker = Marker {
            id: AnnotationId(self.next_id),
            position,
            kind,
            label,
        };

        match scope {
            Scope::Public => self.public_markers.push(marker.clone()),
            Scope::Private => {
                let mut staged = self.private_markers.clone();
                staged.push(marker.clone());
                self.persist_markers(&staged)?;
                self.private_markers = staged;
            }
        }
        self.next_id += 1;

        debug!("Added {} marker '{}' ({:?})", marker.kind, marker.label, scope);
        Ok(marker)
    }

    /// Remove every marker matching `matcher` from both collections.
    pub fn remove_marker(&mut self, matcher: &AnnotationMatcher) -> Result<Vec<Marker>> {
        let mut removed = self.remove_marker_in(matcher, Scope::Private)?;
        removed.extend(self.remove_marker_in(matcher, Scope::Public)?);
        Ok(removed)
    }

    pub fn remove_marker_in(
        &mut self,
        matcher: &AnnotationMatcher,
        scope: Scope,
    ) -> Result<Vec<Marker>> {
        match scope {
            Scope::Public => {
                let (kept, removed) = partition(&self.public_markers, matcher);
                self.public_markers = kept;
                Ok(removed)
            }
            Scope::Private => {
                let (kept, removed) = partition(&self.private_markers, matcher);
                if !removed.is_empty() {
                    self.persist_markers(&kept)?;
                    self.private_markers = kept;
                }
                Ok(removed)
            }
        }
    }

    /// Rename every marker matching `matcher` in both collections.
    pub fn rename_marker(
        &mut self,
        matcher: &AnnotationMatcher,
        new_label: &str,
    ) -> Result<Vec<Marker>> {
        let mut changed = self.rename_marker_in(matcher, new_label, Scope::Private)?;
        changed.extend(self.rename_marker_in(matcher, new_label, Scope::Public)?);
        Ok(changed)
    }

    pub fn rename_marker_in(
        &mut self,
        matcher: &AnnotationMatcher,
        new_label: &str,
        scope: Scope,
    ) -> Result<Vec<Marker>> {
        let new_label = validated_name(new_label)?;
        self.update_markers_in(matcher, scope, |m| m.set_name(new_label.clone()))
    }

    /// Replace label and kind of every match in both collections. The kind
    /// is validated up front; nothing changes when it is unknown.
    pub fn edit_marker(
        &mut self,
        matcher: &AnnotationMatcher,
        new_label: &str,
        kind: &str,
    ) -> Result<Vec<Marker>> {
        let mut changed = self.edit_marker_in(matcher, new_label, kind, Scope::Private)?;
        changed.extend(self.edit_marker_in(matcher, new_label, kind, Scope::Public)?);
        Ok(changed)
    }

    pub fn edit_marker_in(
        &mut self,
        matcher: &AnnotationMatcher,
        new_label: &str,
        kind: &str,
        scope: Scope,
    ) -> Result<Vec<Marker>> {
        let kind: MarkerKind = kind.parse()?;
        let new_label = validated_name(new_label)?;
        self.update_markers_in(matcher, scope, |m| {
            m.label = new_label.clone();
            m.kind = kind;
        })
    }

    fn update_markers_in(
        &mut self,
        matcher: &AnnotationMatcher,
        scope: Scope,
        apply: impl Fn(&mut Marker),
    ) -> Result<Vec<Marker>> {
        match scope {
            Scope::Public => {
                let (all, changed) = updated(&self.public_markers, matcher, apply);
                self.public_markers = all;
                Ok(changed)
            }
            Scope::Private => {
                let (all, changed) = updated(&self.private_markers, matcher, apply);
                if !changed.is_empty() {
                    self.persist_markers(&all)?;
                    self.private_markers = all;
                }
                Ok(changed)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Towns
    // -----------------------------------------------------------------------

    pub fn add_town(&mut self, position: MapPoint, name: &str, scope: Scope) -> Result<TownLabel> {
        let name = validated_name(name)?;
        let town = TownLabel {
            id: AnnotationId(self.next_id),
            position,
            name,
        };

        match scope {
            Scope::Public => self.public_towns.push(town.clone()),
            Scope::Private => {
                let mut staged = self.private_towns.clone();
                staged.push(town.clone());
                self.persist_towns(&staged)?;
                self.private_towns = staged;
            }
        }
        self.next_id += 1;

        debug!("Added town '{}' ({:?})", town.name, scope);
        Ok(town)
    }

    pub fn remove_town(&mut self, matcher: &AnnotationMatcher) -> Result<Vec<TownLabel>> {
        let mut removed = self.remove_town_in(matcher, Scope::Private)?;
        removed.extend(self.remove_town_in(matcher, Scope::Public)?);
        Ok(removed)
    }

    pub fn remove_town_in(
        &mut self,
        matcher: &AnnotationMatcher,
        scope: Scope,
    ) -> Result<Vec<TownLabel>> {
        match scope {
            Scope::Public => {
                let (kept, removed) = partition(&self.public_towns, matcher);
                self.public_towns = kept;
                Ok(removed)
            }
            Scope::Private => {
                let (kept, removed) = partition(&self.private_towns, matcher);
                if !removed.is_empty() {
                    self.persist_towns(&kept)?;
                    self.private_towns = kept;
                }
                Ok(removed)
            }
        }
    }

    pub fn rename_town(
        &mut self,
        matcher: &AnnotationMatcher,
        new_name: &str,
    ) -> Result<Vec<TownLabel>> {
        let mut changed = self.rename_town_in(matcher, new_name, Scope::Private)?;
        changed.extend(self.rename_town_in(matcher, new_name, Scope::Public)?);
        Ok(changed)
    }

    pub fn rename_town_in(
        &mut self,
        matcher: &AnnotationMatcher,
        new_name: &str,
        scope: Scope,
    ) -> Result<Vec<TownLabel>> {
        let new_name = validated_name(new_name)?;
        match scope {
            Scope::Public => {
                let (all, changed) =
                    updated(&self.public_towns, matcher, |t: &mut TownLabel| {
                        t.set_name(new_name.clone())
                    });
                self.public_towns = all;
                Ok(changed)
            }
            Scope::Private => {
                let (all, changed) =
                    updated(&self.private_towns, matcher, |t: &mut TownLabel| {
                        t.set_name(new_name.clone())
                    });
                if !changed.is_empty() {
                    self.persist_towns(&all)?;
                    self.private_towns = all;
                }
                Ok(changed)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Pretty-printed snapshot of a public collection. Callers gate this on
    /// the export capabilities.
    pub fn export_public(&self, kind: AnnotationKind) -> Result<String> {
        let json = match kind {
            AnnotationKind::Markers => {
                let records: Vec<MarkerRecord> =
                    self.public_markers.iter().map(MarkerRecord::from).collect();
                protocol::to_pretty_json(&records)?
            }
            AnnotationKind::Towns => {
                let records: Vec<TownRecord> =
                    self.public_towns.iter().map(TownRecord::from).collect();
                protocol::to_pretty_json(&records)?
            }
        };
        info!("Exported public {}", kind);
        Ok(json)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn public_markers(&self) -> &[Marker] {
        &self.public_markers
    }

    pub fn private_markers(&self) -> &[Marker] {
        &self.private_markers
    }

    pub fn public_towns(&self) -> &[TownLabel] {
        &self.public_towns
    }

    pub fn private_towns(&self) -> &[TownLabel] {
        &self.private_towns
    }

    pub fn markers(&self, scope: Scope) -> &[Marker] {
        match scope {
            Scope::Public => &self.public_markers,
            Scope::Private => &self.private_markers,
        }
    }

    pub fn towns(&self, scope: Scope) -> &[TownLabel] {
        match scope {
            Scope::Public => &self.public_towns,
            Scope::Private => &self.private_towns,
        }
    }

    /// Every marker sharing `name`, with its scope. Names are not unique.
    pub fn markers_named(&self, name: &str) -> Vec<(Scope, &Marker)> {
        let public = self.public_markers.iter().map(|m| (Scope::Public, m));
        let private = self.private_markers.iter().map(|m| (Scope::Private, m));
        public.chain(private).filter(|(_, m)| m.label == name).collect()
    }

    pub fn towns_named(&self, name: &str) -> Vec<(Scope, &TownLabel)> {
        let public = self.public_towns.iter().map(|t| (Scope::Public, t));
        let private = self.private_towns.iter().map(|t| (Scope::Private, t));
        public.chain(private).filter(|(_, t)| t.name == name).collect()
    }

    /// Scope of the annotation with the given id, if any.
    pub fn scope_of(&self, id: AnnotationId) -> Option<Scope> {
        if self.public_markers.iter().any(|m| m.id == id)
            || self.public_towns.iter().any(|t| t.id == id)
        {
            Some(Scope::Public)
        } else if self.private_markers.iter().any(|m| m.id == id)
            || self.private_towns.iter().any(|t| t.id == id)
        {
            Some(Scope::Private)
        } else {
            None
        }
    }

    pub fn resources(&self) -> &ResourceConfig {
        &self.resources
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn allocate_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        id
    }

    fn persist_markers(&mut self, markers: &[Marker]) -> Result<()> {
        let records: Vec<MarkerRecord> = markers.iter().map(MarkerRecord::from).collect();
        let json = protocol::to_compact_json(&records)?;
        self.storage
            .set(&self.resources.private_markers_key, &json)
    }

    fn persist_towns(&mut self, towns: &[TownLabel]) -> Result<()> {
        let records: Vec<TownRecord> = towns.iter().map(TownRecord::from).collect();
        let json = protocol::to_compact_json(&records)?;
        self.storage.set(&self.resources.private_towns_key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> AnnotationStore<MemoryStorage> {
        AnnotationStore::new(MemoryStorage::new(), ResourceConfig::default())
    }

    fn at(v: f64) -> MapPoint {
        MapPoint::new(v, v)
    }

    /// Storage that refuses every write.
    struct ReadOnly(MemoryStorage);

    impl KeyValueStore for ReadOnly {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(ViewerError::Storage("quota exceeded".into()))
        }
    }

    #[test]
    fn invalid_kind_leaves_collections_untouched() {
        let mut s = store();
        let err = s.add_marker(at(1.0), "dragon", "X", Scope::Public).unwrap_err();
        assert!(matches!(err, ViewerError::InvalidKind(_)));
        assert!(s.public_markers().is_empty());
    }

    #[test]
    fn empty_label_is_malformed() {
        let mut s = store();
        let err = s.add_marker(at(1.0), "house", "   ", Scope::Private).unwrap_err();
        assert!(matches!(err, ViewerError::MalformedInput(_)));
        assert!(s.private_markers().is_empty());
        assert!(s.storage().is_empty());
    }

    #[test]
    fn public_add_does_not_touch_storage() {
        let mut s = store();
        s.add_marker(at(1.0), "tower", "Watch", Scope::Public).unwrap();
        assert_eq!(s.public_markers().len(), 1);
        assert!(s.storage().is_empty());
    }

    #[test]
    fn failed_write_rolls_back_private_add() {
        let mut s = AnnotationStore::new(ReadOnly(MemoryStorage::new()), ResourceConfig::default());
        let err = s.add_marker(at(1.0), "tent", "Camp", Scope::Private).unwrap_err();
        assert!(matches!(err, ViewerError::Storage(_)));
        assert!(s.private_markers().is_empty());
    }

    #[test]
    fn remove_by_name_hits_every_duplicate_in_both_scopes() {
        let mut s = store();
        s.add_marker(at(1.0), "house", "Camp", Scope::Public).unwrap();
        s.add_marker(at(2.0), "tent", "Camp", Scope::Private).unwrap();
        s.add_marker(at(3.0), "tent", "Other", Scope::Private).unwrap();
        assert_eq!(s.markers_named("Camp").len(), 2);

        let removed = s.remove_marker(&"Camp".into()).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(s.public_markers().is_empty());
        assert_eq!(s.private_markers().len(), 1);
        assert!(s.storage().get("privateMarkers").unwrap().unwrap().contains("Other"));
    }

    #[test]
    fn remove_by_id_spares_namesakes() {
        let mut s = store();
        let a = s.add_marker(at(1.0), "house", "Camp", Scope::Private).unwrap();
        s.add_marker(at(2.0), "house", "Camp", Scope::Private).unwrap();
        let removed = s.remove_marker(&AnnotationMatcher::Id(a.id)).unwrap();
        assert_eq!(removed, vec![a]);
        assert_eq!(s.private_markers().len(), 1);
    }

    #[test]
    fn rename_keeps_kind_and_persists() {
        let mut s = store();
        s.add_marker(at(1.0), "trader", "Shop", Scope::Private).unwrap();
        let changed = s.rename_marker(&"Shop".into(), "Market").unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].kind, MarkerKind::Trader);

        let stored = s.storage().get("privateMarkers").unwrap().unwrap();
        assert!(stored.contains("Market"));
        assert!(!stored.contains("Shop"));
    }

    #[test]
    fn edit_changes_label_and_kind_and_persists() {
        let mut s = store();
        s.add_marker(at(1.0), "tent", "Camp", Scope::Private).unwrap();
        s.add_marker(at(2.0), "tent", "Camp", Scope::Public).unwrap();
        let changed = s.edit_marker(&"Camp".into(), "Fort", "TOWER").unwrap();
        assert_eq!(changed.len(), 2);
        assert!(changed
            .iter()
            .all(|m| m.kind == MarkerKind::Tower && m.label == "Fort"));

        let stored = s.storage().get("privateMarkers").unwrap().unwrap();
        assert!(stored.contains(r#""type":"tower""#));
        assert!(stored.contains("Fort"));
    }

    #[test]
    fn edit_with_unknown_kind_changes_nothing() {
        let mut s = store();
        s.add_marker(at(1.0), "tent", "Camp", Scope::Private).unwrap();
        s.add_marker(at(2.0), "house", "Camp", Scope::Public).unwrap();
        let before = s.storage().get("privateMarkers").unwrap();

        let err = s.edit_marker(&"Camp".into(), "Fort", "dragon").unwrap_err();
        assert!(matches!(err, ViewerError::InvalidKind(_)));
        assert_eq!(s.private_markers()[0].label, "Camp");
        assert_eq!(s.private_markers()[0].kind, MarkerKind::Tent);
        assert_eq!(s.public_markers()[0].kind, MarkerKind::House);
        assert_eq!(s.storage().get("privateMarkers").unwrap(), before);
    }

    #[test]
    fn failed_write_rolls_back_private_remove_and_rename() {
        let storage = MemoryStorage::new().with_entry(
            "privateMarkers",
            r#"[{"latlng":{"lat":1,"lng":1},"type":"tent","name":"Camp"}]"#,
        );
        let mut s = AnnotationStore::new(ReadOnly(storage), ResourceConfig::default());
        assert_eq!(s.private_markers().len(), 1);

        let err = s.remove_marker_in(&"Camp".into(), Scope::Private).unwrap_err();
        assert!(matches!(err, ViewerError::Storage(_)));
        assert_eq!(s.private_markers().len(), 1);

        let err = s
            .rename_marker_in(&"Camp".into(), "Fort", Scope::Private)
            .unwrap_err();
        assert!(matches!(err, ViewerError::Storage(_)));
        assert_eq!(s.private_markers()[0].label, "Camp");
    }

    #[test]
    fn remove_town_by_name_hits_every_duplicate() {
        let mut s = store();
        s.add_town(at(1.0), "Ashford", Scope::Public).unwrap();
        s.add_town(at(2.0), "Ashford", Scope::Public).unwrap();
        s.add_town(at(3.0), "Ashford", Scope::Private).unwrap();
        s.add_town(at(4.0), "Millhaven", Scope::Public).unwrap();

        let removed = s.remove_town(&"Ashford".into()).unwrap();
        assert_eq!(removed.len(), 3);
        assert_eq!(s.public_towns().len(), 1);
        assert_eq!(s.public_towns()[0].name, "Millhaven");
        assert!(s.private_towns().is_empty());
        assert_eq!(s.storage().get("privateTowns").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn private_town_rename_persists() {
        let mut s = store();
        s.add_town(at(7.0), "Hideout", Scope::Private).unwrap();
        let changed = s
            .rename_town_in(&"Hideout".into(), "Lair", Scope::Private)
            .unwrap();
        assert_eq!(changed.len(), 1);

        let stored = s.storage().get("privateTowns").unwrap().unwrap();
        assert!(stored.contains("Lair"));
        assert!(!stored.contains("Hideout"));
        let reloaded = AnnotationStore::new(s.into_storage(), ResourceConfig::default());
        assert_eq!(reloaded.private_towns()[0].name, "Lair");
    }

    #[test]
    fn malformed_private_storage_loads_empty() {
        let storage = MemoryStorage::new().with_entry("privateMarkers", "{not json");
        let s = AnnotationStore::new(storage, ResourceConfig::default());
        assert!(s.private_markers().is_empty());
    }

    #[test]
    fn stored_marker_with_unknown_kind_is_dropped() {
        let storage = MemoryStorage::new().with_entry(
            "privateMarkers",
            r#"[{"latlng":{"lat":1,"lng":1},"type":"dragon","name":"X"},
                {"latlng":{"lat":2,"lng":2},"type":"tent","name":"Y"}]"#,
        );
        let s = AnnotationStore::new(storage, ResourceConfig::default());
        assert_eq!(s.private_markers().len(), 1);
        assert_eq!(s.private_markers()[0].label, "Y");
    }

    #[test]
    fn applying_same_public_body_twice_does_not_duplicate() {
        let mut s = store();
        let body = r#"[{"latlng":{"lat":5,"lng":6},"type":"tower","name":"T"}]"#;
        assert_eq!(s.apply_public(AnnotationKind::Markers, body), 1);
        assert_eq!(s.apply_public(AnnotationKind::Markers, body), 0);
        assert_eq!(s.public_markers().len(), 1);
    }

    #[test]
    fn identical_records_in_one_body_are_all_kept() {
        let mut s = store();
        let body = r#"[{"latlng":{"lat":5,"lng":6},"type":"tower","name":"T"},
                       {"latlng":{"lat":5,"lng":6},"type":"tower","name":"T"}]"#;
        assert_eq!(s.apply_public(AnnotationKind::Markers, body), 2);
        assert_eq!(s.public_markers().len(), 2);

        let exported = s.export_public(AnnotationKind::Markers).unwrap();
        let records: Vec<serde_json::Value> = serde_json::from_str(&exported).unwrap();
        assert_eq!(records.len(), 2);

        // A second load of the same file adds nothing on top.
        assert_eq!(s.apply_public(AnnotationKind::Markers, body), 0);
        assert_eq!(s.public_markers().len(), 2);
    }

    #[test]
    fn identical_town_records_in_one_body_are_all_kept() {
        let mut s = store();
        let body = r#"[{"latlng":{"lat":1,"lng":2},"name":"Ashford"},
                       {"latlng":{"lat":1,"lng":2},"name":"Ashford"}]"#;
        assert_eq!(s.apply_public_towns(body).len(), 2);
        assert_eq!(s.public_towns().len(), 2);
    }

    #[test]
    fn late_public_load_skips_entry_added_in_session() {
        let mut s = store();
        s.add_town(MapPoint::new(10.0, 20.0), "Millhaven", Scope::Public)
            .unwrap();
        let body = r#"[{"latlng":{"lat":10,"lng":20},"name":"Millhaven"},
                       {"latlng":{"lat":30,"lng":40},"name":"Ashford"}]"#;
        let added = s.apply_public_towns(body);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].name, "Ashford");
        assert_eq!(s.public_towns().len(), 2);
    }

    #[test]
    fn ids_are_unique_across_collections() {
        let mut s = store();
        let a = s.add_marker(at(1.0), "house", "A", Scope::Public).unwrap();
        let b = s.add_marker(at(1.0), "house", "B", Scope::Private).unwrap();
        let t = s.add_town(at(1.0), "T", Scope::Public).unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, t.id);
        assert_eq!(s.scope_of(a.id), Some(Scope::Public));
        assert_eq!(s.scope_of(b.id), Some(Scope::Private));
    }

    #[test]
    fn private_towns_round_trip_through_storage() {
        let mut s = store();
        s.add_town(at(7.0), "Hideout", Scope::Private).unwrap();
        let reloaded = AnnotationStore::new(s.into_storage(), ResourceConfig::default());
        assert_eq!(reloaded.private_towns().len(), 1);
        assert_eq!(reloaded.private_towns()[0].name, "Hideout");
    }

    #[test]
    fn reset_drops_public_and_keeps_private() {
        let mut s = store();
        s.add_marker(at(1.0), "house", "Pub", Scope::Public).unwrap();
        s.add_marker(at(2.0), "house", "Priv", Scope::Private).unwrap();
        s.reset();
        assert!(s.public_markers().is_empty());
        assert_eq!(s.private_markers().len(), 1);
    }
}
