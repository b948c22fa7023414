use steam_appmanifest::domain::GameRecord;
use steam_appmanifest::library::GameLibrary;

fn batch() -> Vec<GameRecord> {
    [
        ("10", "Counter-Strike"),
        ("70", "Half-Life"),
        ("220", "Half-Life 2"),
        ("400", "Portal"),
        ("620", "Portal 2"),
        ("4000", "Garry's Mod"),
    ]
    .into_iter()
    .map(|(id, name)| GameRecord::new(id.parse().unwrap(), name))
    .collect()
}

fn visible_ids(library: &GameLibrary) -> Vec<String> {
    library
        .visible_records()
        .iter()
        .map(|entry| entry.record.app_id.to_string())
        .collect()
}

#[test]
fn filter_is_case_insensitive_substring_in_order() {
    let mut library = GameLibrary::new();
    library.replace_all(batch());

    for filter in ["portal", "PORTAL", "PoRt", "life", "-", "2", "'s m", "zzz"] {
        library.set_filter(filter);
        let expected: Vec<String> = batch()
            .into_iter()
            .filter(|record| record.name.to_lowercase().contains(&filter.to_lowercase()))
            .map(|record| record.app_id.to_string())
            .collect();
        assert_eq!(visible_ids(&library), expected, "filter {filter:?}");
    }
}

#[test]
fn empty_filter_shows_full_batch() {
    let mut library = GameLibrary::new();
    library.replace_all(batch());
    library.set_filter("half");
    library.set_filter("");
    assert_eq!(
        visible_ids(&library),
        vec!["10", "70", "220", "400", "620", "4000"]
    );
}

#[test]
fn toggle_through_filtered_view_survives_clearing_filter() {
    let mut library = GameLibrary::new();
    library.replace_all(batch());

    library.set_filter("portal 2");
    let handle = library.visible_records()[0].handle;
    assert!(library.toggle(handle));

    library.set_filter("");
    let portal_two = library
        .visible_records()
        .into_iter()
        .find(|entry| entry.record.app_id.as_str() == "620")
        .unwrap();
    assert!(portal_two.record.selected);
    assert_eq!(library.selected_count(), 1);
}

#[test]
fn handle_resolves_after_filter_hides_and_reshows_record() {
    let mut library = GameLibrary::new();
    library.replace_all(batch());

    library.set_filter("garry");
    let handle = library.visible_records()[0].handle;

    library.set_filter("portal");
    assert!(library.toggle(handle));
    assert!(library.visible_records().iter().all(|entry| !entry.record.selected));

    library.set_filter("");
    let selected = library.selected_records();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].app_id.as_str(), "4000");
}

#[test]
fn filter_does_not_change_selection() {
    let mut library = GameLibrary::new();
    library.replace_all(batch());
    let handles: Vec<_> = library
        .visible_records()
        .iter()
        .map(|entry| entry.handle)
        .collect();
    library.toggle(handles[1]);
    library.toggle(handles[3]);

    library.set_filter("counter");
    let selected: Vec<String> = library
        .selected_records()
        .iter()
        .map(|record| record.app_id.to_string())
        .collect();
    assert_eq!(selected, vec!["70", "400"]);
}

#[test]
fn replace_all_resets_selection() {
    let mut library = GameLibrary::new();
    library.replace_all(batch());
    for entry in library.visible_records().iter().map(|entry| entry.handle).collect::<Vec<_>>() {
        library.toggle(entry);
    }
    assert_eq!(library.selected_count(), 6);

    let mut incoming = batch();
    incoming[0].selected = true;
    library.replace_all(incoming);
    assert_eq!(library.selected_count(), 0);
    assert!(library.visible_records().iter().all(|entry| !entry.record.selected));
}

#[test]
fn toggle_app_by_identifier() {
    let mut library = GameLibrary::new();
    library.replace_all(batch());
    library.set_filter("portal");

    assert!(library.toggle_app(&"70".parse().unwrap()));
    assert!(!library.toggle_app(&"999".parse().unwrap()));
    assert_eq!(library.selected_records()[0].name, "Half-Life");
}
