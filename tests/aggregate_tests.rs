use ncaa_baseball_stats::{
    aggregate_category, aggregate_master, aggregate_school, aggregate_season, Frame, LabelPath, Level, MasterTable,
    StatCategory, StatTable,
};

fn table(columns: &[&str], rows: &[&[&str]]) -> StatTable {
    StatTable::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter().map(|r| r.iter().map(|v| v.to_string()).collect()).collect(),
    )
}

fn hitting(player: &str) -> StatTable {
    table(&["Player", "AB", "H"], &[&[player, "10", "3"], &["Jones", "8", "2"]])
}

fn pitching(player: &str) -> StatTable {
    table(&["Player", "IP", "ERA", "SO"], &[&[player, "20.1", "3.10", "18"]])
}

fn season_frame(tag: &str) -> Frame {
    aggregate_season(vec![
        (
            StatCategory::Hitting,
            aggregate_category(vec![
                ("Overall".to_string(), hitting(tag)),
                ("Conference".to_string(), hitting(tag)),
            ]),
        ),
        (StatCategory::Pitching, aggregate_category(vec![("Overall".to_string(), pitching(tag))])),
    ])
}

/// Two schools, two seasons each, hitting and pitching.
fn sample_master() -> MasterTable {
    aggregate_master(vec![
        (
            "Boston College".to_string(),
            aggregate_school(vec![
                ("2015-16".to_string(), season_frame("a")),
                ("2014-15".to_string(), season_frame("b")),
            ]),
        ),
        (
            "Clemson".to_string(),
            aggregate_school(vec![
                ("2015-16".to_string(), season_frame("c")),
                ("2014-15".to_string(), season_frame("d")),
            ]),
        ),
    ])
}

const LEVELS: [Level; 4] = [Level::School, Level::Season, Level::Category, Level::Situation];

#[test]
fn test_master_labels_every_table() {
    let master = sample_master();
    assert_eq!(master.table_count(), 12);
    assert_eq!(master.row_count(), 2 * 2 * (2 + 2 + 1));

    let first = &master.tables()[0];
    assert_eq!(first.path, LabelPath::new("Boston College", "2015-16", StatCategory::Hitting, "Overall"));
    let last = &master.tables()[11];
    assert_eq!(last.path, LabelPath::new("Clemson", "2014-15", StatCategory::Pitching, "Overall"));
}

#[test]
fn test_split_then_merge_at_every_level() {
    let master = sample_master();
    for level in LEVELS {
        let parts = master.split_by(level);
        let merged = MasterTable::concat(parts.iter().map(|(_, part)| part.clone()));
        assert_eq!(merged.split_by(level), parts, "level {:?}", level);
    }
}

#[test]
fn test_split_by_groups_in_first_seen_order() {
    let master = sample_master();

    let schools: Vec<_> = master.split_by(Level::School).into_iter().map(|(l, _)| l).collect();
    assert_eq!(schools, vec!["Boston College", "Clemson"]);

    let categories = master.split_by(Level::Category);
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].0, "hitting");
    assert_eq!(categories[0].1.table_count(), 8);
    assert_eq!(categories[1].1.table_count(), 4);
}

#[test]
fn test_split_outer_inverts_concat() {
    let parts = vec![
        ("2015-16".to_string(), season_frame("a")),
        ("2014-15".to_string(), season_frame("b")),
    ];
    let joined = aggregate_school(parts.clone());
    assert_eq!(joined.split_outer(), parts);
}

#[test]
fn test_master_frame_round_trip() {
    let master = sample_master();
    let schools = master.clone().into_frame().split_outer();
    assert_eq!(schools.len(), 2);
    assert_eq!(aggregate_master(schools), master);
}

#[test]
fn test_duplicate_labels_keep_first() {
    let frame = aggregate_category(vec![
        ("Overall".to_string(), hitting("first")),
        ("Overall".to_string(), hitting("second")),
    ]);
    assert_eq!(frame.segments().len(), 1);
    assert_eq!(frame.segments()[0].table.rows[0][0], "first");
}

#[test]
fn test_categories_keep_their_own_columns() {
    let master = sample_master();
    assert_eq!(master.category_columns(StatCategory::Hitting), vec!["Player", "AB", "H"]);
    assert_eq!(master.category_columns(StatCategory::Pitching), vec!["Player", "IP", "ERA", "SO"]);
    assert!(master.category_columns(StatCategory::Fielding).is_empty());
}

#[test]
fn test_category_without_variants_contributes_nothing() {
    let season = aggregate_season(vec![
        (StatCategory::Hitting, aggregate_category(Vec::new())),
        (StatCategory::Pitching, aggregate_category(vec![("Overall".to_string(), pitching("x"))])),
    ]);
    let master = aggregate_master(vec![("Boston College".to_string(), aggregate_school(vec![("2015-16".to_string(), season)]))]);

    assert_eq!(master.table_count(), 1);
    assert_eq!(master.tables()[0].path.category, StatCategory::Pitching);
}

#[test]
fn test_partially_labeled_segments_are_dropped() {
    // school and season only, no category/situation
    let shallow = Frame::concat(vec![(
        "Boston College".to_string(),
        Frame::concat(vec![("2015-16".to_string(), Frame::leaf(hitting("a")))]),
    )]);
    assert!(MasterTable::from_frame(shallow).is_empty());

    let unknown = aggregate_master(vec![(
        "Boston College".to_string(),
        Frame::concat(vec![(
            "2015-16".to_string(),
            Frame::concat(vec![("baserunning".to_string(), aggregate_category(vec![("Overall".to_string(), hitting("a"))]))]),
        )]),
    )]);
    assert!(unknown.is_empty());
}

#[test]
fn test_rows_carry_ordinals_per_table() {
    let master = sample_master();
    let ordinals: Vec<usize> = master.rows().take(5).map(|r| r.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 0, 1, 0]);
}

#[test]
fn test_push_rejects_duplicate_path() {
    let mut master = MasterTable::new();
    let path = LabelPath::new("Boston College", "2015-16", StatCategory::Fielding, "Fielding");
    assert!(master.push(path.clone(), hitting("a")));
    assert!(!master.push(path, hitting("b")));
    assert_eq!(master.table_count(), 1);
}

#[test]
fn test_split_parts_still_reject_duplicates() {
    let master = sample_master();
    let mut parts = master.split_by(Level::School);
    let (_, boston) = &mut parts[0];
    let existing = LabelPath::new("Boston College", "2014-15", StatCategory::Pitching, "Overall");
    assert!(!boston.push(existing, pitching("z")));
    assert_eq!(boston.table_count(), 6);
}

#[test]
fn test_master_scales_to_a_full_division() {
    // 300 schools x 12 seasons x (12 hitting + 12 pitching) splits
    let splits: Vec<String> = (0..12).map(|i| format!("split {}", i)).collect();
    let one_row = table(&["Player", "AB"], &[&["Smith", "1"]]);
    let season = || {
        aggregate_season(vec![
            (
                StatCategory::Hitting,
                aggregate_category(splits.iter().map(|s| (s.clone(), one_row.clone())).collect()),
            ),
            (
                StatCategory::Pitching,
                aggregate_category(splits.iter().map(|s| (s.clone(), one_row.clone())).collect()),
            ),
        ])
    };
    let schools = (0..300)
        .map(|school| {
            let seasons = (0..12).map(|y| (format!("{}-{}", 2000 + y, 1 + y), season())).collect();
            (format!("School {}", school), aggregate_school(seasons))
        })
        .collect();

    let started = std::time::Instant::now();
    let master = aggregate_master(schools);
    let merged = MasterTable::concat(master.split_by(Level::School).into_iter().map(|(_, part)| part));

    assert_eq!(master.table_count(), 300 * 12 * 24);
    assert_eq!(merged, master);
    assert!(started.elapsed() < std::time::Duration::from_secs(30), "took {:?}", started.elapsed());
}
