//! Viewer end-to-end tests

#[cfg(test)]
mod tests {
    use ravenmap::{
        AnnotationKind, AnnotationMatcher, AnnotationStore, Capability, ClickOutcome,
        KeyValueStore, LayerId, MapPoint, MemorySource, MemoryStorage, RenderCommand,
        ResourceConfig, Role, RolePolicy, Scope, Viewer, ViewerConfig, ViewerError,
    };

    fn viewer() -> Viewer<MemoryStorage> {
        Viewer::new(ViewerConfig::default(), MemoryStorage::new())
    }

    fn place_marker(v: &mut Viewer<MemoryStorage>, at: MapPoint, kind: &str, label: &str) {
        v.start_marker_placement().unwrap();
        v.click(at);
        v.submit_marker_details(kind, label).unwrap();
    }

    // -----------------------------------------------------------------------
    // Scenario A – admin places and exports a town
    // -----------------------------------------------------------------------

    #[test]
    fn admin_places_and_exports_town() {
        let mut v = viewer();
        let session = v.login("Kingosp4de", "BlaiseKey2026");
        assert_eq!(session.role, Role::Admin);

        v.start_town_placement().unwrap();
        v.click(MapPoint::new(1472.0, 1472.0));
        let town = v.submit_town_name("Millhaven").unwrap();

        let towns = v.store().public_towns();
        assert_eq!(towns.len(), 1);
        assert_eq!(towns[0].position, MapPoint::new(1472.0, 1472.0));
        assert_eq!(towns[0].name, "Millhaven");
        assert!(v.store().private_towns().is_empty());

        let export = v.export_public(AnnotationKind::Towns).unwrap();
        assert_eq!(export.file_name, "publicTowns.json");
        let parsed: serde_json::Value = serde_json::from_str(&export.contents).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([{ "latlng": { "lat": 1472.0, "lng": 1472.0 }, "name": "Millhaven" }])
        );
        assert!(export.contents.contains('\n'), "export should be pretty-printed");

        let drawn = v.drain_render_commands();
        assert!(drawn.contains(&RenderCommand::DrawLabel {
            layer: LayerId::Annotation(town.id),
            position: MapPoint::new(1472.0, 1472.0),
            text: "Millhaven".into(),
        }));
    }

    // -----------------------------------------------------------------------
    // Scenario B – anonymous marker
    // -----------------------------------------------------------------------

    #[test]
    fn anonymous_visitor_cannot_place_marker_without_session() {
        let mut v = viewer();
        assert!(matches!(
            v.start_marker_placement(),
            Err(ViewerError::AuthRequired)
        ));
    }

    #[test]
    fn player_marker_stays_private_and_persists() {
        let mut v = viewer();
        v.login("wanderer", "");
        place_marker(&mut v, MapPoint::new(1000.0, 1000.0), "house", "Cabin");

        assert!(v.store().public_markers().is_empty());
        assert_eq!(v.store().private_markers().len(), 1);
        assert_eq!(v.store().private_markers()[0].label, "Cabin");

        let stored = v.store().storage().get("privateMarkers").unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([{ "latlng": { "lat": 1000.0, "lng": 1000.0 }, "type": "house", "name": "Cabin" }])
        );
    }

    #[test]
    fn store_level_private_marker_without_session() {
        let mut store = AnnotationStore::new(MemoryStorage::new(), ResourceConfig::default());
        store
            .add_marker(MapPoint::new(1000.0, 1000.0), "house", "Cabin", Scope::Private)
            .unwrap();
        assert_eq!(store.private_markers().len(), 1);
        assert!(store.public_markers().is_empty());
        let stored = store.storage().get("privateMarkers").unwrap().unwrap();
        assert!(stored.contains("\"Cabin\""));
    }

    // -----------------------------------------------------------------------
    // Scenario C – measurement
    // -----------------------------------------------------------------------

    #[test]
    fn two_clicks_report_distance() {
        let mut v = viewer();
        v.drain_render_commands();
        v.click(MapPoint::new(1472.0, 1472.0));
        let ClickOutcome::Measured(m) = v.click(MapPoint::new(1472.0, 1504.0)) else {
            panic!("second click should complete the measurement");
        };
        assert_eq!(format!("{:.2}", m.distance), "32.00");
        assert_eq!((m.dx, m.dz), (32, 0));
        assert_eq!(
            v.drain_render_commands(),
            vec![RenderCommand::Notify {
                message: "Distance: 32.00 blocks (ΔX: 32, ΔZ: 0)".into()
            }]
        );
    }

    // -----------------------------------------------------------------------
    // Gating & validation
    // -----------------------------------------------------------------------

    #[test]
    fn player_cannot_export_or_place_towns() {
        let mut v = viewer();
        v.login("wanderer", "");
        assert!(!v.can(Capability::ExportPublicMarkers));
        assert!(matches!(
            v.export_public(AnnotationKind::Markers),
            Err(ViewerError::Permission { .. })
        ));
        assert!(matches!(
            v.start_town_placement(),
            Err(ViewerError::Permission { .. })
        ));
    }

    #[test]
    fn blank_username_logs_in_as_player() {
        let mut v = viewer();
        let session = v.login("", "");
        assert_eq!(session.role, Role::Player);
        assert_eq!(session.username, "");
        assert!(v.start_marker_placement().is_ok());
    }

    #[test]
    fn admin_only_export_policy_blocks_moderator() {
        let config = ViewerConfig {
            policy: RolePolicy::admin_only_exports(),
            ..ViewerConfig::default()
        };
        let mut v = Viewer::new(config, MemoryStorage::new());
        v.login("Xzyus", "HitByAAda4x4");
        assert!(v.export_public(AnnotationKind::Towns).is_err());
        assert!(v.start_town_placement().is_ok());
    }

    #[test]
    fn moderator_markers_are_public() {
        let mut v = viewer();
        v.login("Xzyus", "HitByAAda4x4");
        place_marker(&mut v, MapPoint::new(10.0, 10.0), "trader", "Bazaar");
        assert_eq!(v.store().public_markers().len(), 1);
        assert!(v.store().private_markers().is_empty());
        assert!(v.store().storage().is_empty());
    }

    #[test]
    fn invalid_kind_rejects_without_appending() {
        let mut v = viewer();
        v.login("Kingosp4de", "BlaiseKey2026");
        v.start_marker_placement().unwrap();
        v.click(MapPoint::new(1.0, 1.0));
        assert!(matches!(
            v.submit_marker_details("dragon", "X"),
            Err(ViewerError::InvalidKind(_))
        ));
        assert!(v.store().public_markers().is_empty());
        // still waiting, so the user can try again
        assert!(v.pending_input().is_some());
        v.submit_marker_details("tower", "X").unwrap();
        assert_eq!(v.store().public_markers().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    #[test]
    fn reload_from_storage_yields_exactly_the_private_entry() {
        let mut v = viewer();
        v.login("wanderer", "");
        place_marker(&mut v, MapPoint::new(5.0, 5.0), "house", "Camp");

        let storage = v.store().storage().clone();
        let reloaded = Viewer::new(ViewerConfig::default(), storage);
        let markers = reloaded.store().private_markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].label, "Camp");
        assert_eq!(markers[0].position, MapPoint::new(5.0, 5.0));
    }

    #[test]
    fn player_edits_do_not_reach_public_markers() {
        let mut v = viewer();
        v.apply_public_resource(
            AnnotationKind::Markers,
            Ok(r#"[{"latlng":{"lat":1,"lng":1},"type":"tent","name":"Camp"}]"#.into()),
        );
        v.login("wanderer", "");
        place_marker(&mut v, MapPoint::new(2.0, 2.0), "tent", "Camp");

        let removed = v.remove_marker(&AnnotationMatcher::Name("Camp".into())).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(v.store().public_markers().len(), 1);
        assert!(v.store().private_markers().is_empty());
    }

    #[test]
    fn rename_redraws_marker() {
        let mut v = viewer();
        v.login("wanderer", "");
        place_marker(&mut v, MapPoint::new(2.0, 2.0), "tent", "Camp");
        v.drain_render_commands();

        let changed = v.rename_marker(&"Camp".into(), "Base").unwrap();
        let id = changed[0].id;
        let cmds = v.drain_render_commands();
        assert_eq!(
            cmds[0],
            RenderCommand::RemoveLayer {
                layer: LayerId::Annotation(id)
            }
        );
        assert!(matches!(&cmds[1], RenderCommand::DrawMarker { label, .. } if label == "Base"));
    }

    #[test]
    fn player_town_edits_do_not_reach_public_towns() {
        let mut v = viewer();
        v.apply_public_resource(
            AnnotationKind::Towns,
            Ok(r#"[{"latlng":{"lat":1,"lng":1},"name":"Ashford"},
                   {"latlng":{"lat":2,"lng":2},"name":"Millhaven"}]"#
                .into()),
        );
        v.login("wanderer", "");

        assert!(v.remove_town(&"Ashford".into()).unwrap().is_empty());
        assert!(v.rename_town(&"Millhaven".into(), "Mudhole").unwrap().is_empty());
        let names: Vec<&str> = v.store().public_towns().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Ashford", "Millhaven"]);
    }

    #[test]
    fn edit_marker_changes_kind_and_redraws() {
        let mut v = viewer();
        v.login("wanderer", "");
        place_marker(&mut v, MapPoint::new(2.0, 2.0), "tent", "Camp");
        v.drain_render_commands();

        let changed = v.edit_marker(&"Camp".into(), "Outpost", "tower").unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(v.store().private_markers()[0].label, "Outpost");
        assert_eq!(v.store().private_markers()[0].kind.as_str(), "tower");

        let cmds = v.drain_render_commands();
        assert!(matches!(&cmds[0], RenderCommand::RemoveLayer { .. }));
        assert!(matches!(&cmds[1], RenderCommand::DrawMarker { label, .. } if label == "Outpost"));
    }

    #[test]
    fn edit_marker_rejects_unknown_kind() {
        let mut v = viewer();
        v.login("wanderer", "");
        place_marker(&mut v, MapPoint::new(2.0, 2.0), "tent", "Camp");
        v.drain_render_commands();

        assert!(matches!(
            v.edit_marker(&"Camp".into(), "Lair", "dragon"),
            Err(ViewerError::InvalidKind(_))
        ));
        assert_eq!(v.store().private_markers()[0].label, "Camp");
        assert!(v.drain_render_commands().is_empty());
    }

    // -----------------------------------------------------------------------
    // Public loading
    // -----------------------------------------------------------------------

    #[test]
    fn public_resources_load_and_missing_ones_degrade() {
        let mut v = viewer();
        let source = MemorySource::new().with(
            "publicMarkers.json",
            r#"[{"latlng":{"lat":100,"lng":200},"type":"safezone","name":"Haven"}]"#,
        );
        let added = tokio_test::block_on(v.load_public(&source));
        assert_eq!(added, 1);
        assert_eq!(v.store().public_markers()[0].label, "Haven");
        assert!(v.store().public_towns().is_empty());
    }

    #[test]
    fn identical_public_records_are_kept_and_exported() {
        let mut v = viewer();
        let record = r#"{"latlng":{"lat":5,"lng":6},"type":"tower","name":"T"}"#;
        let added = v.apply_public_resource(
            AnnotationKind::Markers,
            Ok(format!("[{},{}]", record, record)),
        );
        assert_eq!(added, 2);

        v.login("Kingosp4de", "BlaiseKey2026");
        let export = v.export_public(AnnotationKind::Markers).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&export.contents).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn failed_fetch_is_not_an_error() {
        let mut v = viewer();
        let added = v.apply_public_resource(
            AnnotationKind::Towns,
            Err(ViewerError::ResourceUnavailable {
                resource: "publicTowns.json".into(),
                reason: "timeout".into(),
            }),
        );
        assert_eq!(added, 0);
        assert!(v.store().public_towns().is_empty());
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn logout_resets_everything_but_private_storage() {
        let mut v = viewer();
        v.login("Kingosp4de", "BlaiseKey2026");
        place_marker(&mut v, MapPoint::new(1.0, 1.0), "house", "Public");
        v.start_town_placement().unwrap();
        v.toggle_grid();

        v.logout();
        assert!(v.session().is_none());
        assert!(v.mode() == &ravenmap::PlacementMode::Idle);
        assert!(v.store().public_markers().is_empty());
        assert!(!v.grid_visible());
        assert_eq!(v.drain_render_commands()[0], RenderCommand::Clear);
    }

    #[test]
    fn logout_keeps_private_markers_drawn() {
        let mut v = viewer();
        v.login("wanderer", "");
        place_marker(&mut v, MapPoint::new(3.0, 3.0), "tent", "Stash");
        v.logout();
        let cmds = v.drain_render_commands();
        assert!(cmds
            .iter()
            .any(|c| matches!(c, RenderCommand::DrawMarker { label, .. } if label == "Stash")));
        assert_eq!(v.store().markers(Scope::Private).len(), 1);
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    #[test]
    fn go_to_converts_and_pins() {
        let mut v = viewer();
        v.drain_render_commands();
        let p = v.go_to("64 -64").unwrap();
        assert_eq!(p, MapPoint::new(1472.0, 1472.0));
        let cmds = v.drain_render_commands();
        assert!(cmds.contains(&RenderCommand::SetView {
            position: p,
            zoom: 2
        }));
        assert!(cmds.contains(&RenderCommand::DrawPin {
            position: p,
            text: "X: 64 Z: -64".into()
        }));
    }

    #[test]
    fn go_to_rejects_bad_input() {
        let mut v = viewer();
        assert!(matches!(v.go_to("64"), Err(ViewerError::MalformedInput(_))));
    }

    #[test]
    fn readout_and_inspect() {
        let mut v = viewer();
        assert_eq!(v.coord_readout(MapPoint::new(1408.0, 1408.0)), "X: 0 | Z: 0");
        let c = v.inspect(MapPoint::new(1400.0, 1420.0));
        assert_eq!((c.x, c.z), (12, 8));
    }

    #[test]
    fn grid_toggles() {
        let mut v = viewer();
        v.drain_render_commands();
        assert!(v.toggle_grid());
        assert!(matches!(
            v.drain_render_commands()[0],
            RenderCommand::DrawGrid { spacing, .. } if spacing == 32.0
        ));
        assert!(!v.toggle_grid());
        assert_eq!(
            v.drain_render_commands(),
            vec![RenderCommand::RemoveLayer {
                layer: LayerId::Grid
            }]
        );
    }
}
