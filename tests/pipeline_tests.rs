//! End-to-end conversion of document pairs written to disk.

use legends_db::{
    emit, import_legends, Converter, GenericValue, ImportConfig, ImportError, InputPair,
    SqlScriptSink, SqliteSink,
};
use std::path::{Path, PathBuf};

fn write_pair(dir: &Path, base: &[u8], plus: &str) -> PathBuf {
    let base_path = dir.join("region1-legends.xml");
    std::fs::write(&base_path, base).unwrap();
    std::fs::write(dir.join("region1-legends_plus.xml"), plus).unwrap();
    base_path
}

#[test]
fn test_regions_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_pair(
        dir.path(),
        br#"<df_world><regions><region id="1" name="Foo" type="Forest"/></regions></df_world>"#,
        r#"<df_world><regions><region id="1" evilness="12"/></regions></df_world>"#,
    );

    let config = ImportConfig::default();
    let catalog = Converter::new(config.clone())
        .convert_files(&InputPair::from_base(&base, &config))
        .unwrap();

    let regions = catalog.table("regions").unwrap();
    assert_eq!(regions.columns, vec!["id", "name", "type", "evilness"]);
    assert_eq!(regions.rows.len(), 1);
    assert_eq!(
        regions.project(&["id", "name", "type", "evilness"]),
        vec![vec!["1", "Foo", "Forest", "12"]]
    );
}

#[test]
fn test_cp437_base_and_utf8_plus() {
    let dir = tempfile::tempdir().unwrap();
    let mut base = b"<?xml version=\"1.0\" encoding='UTF-8'?>\n<df_world><historical_figures>\
<historical_figure><id>9</id><name>urist d".to_vec();
    base.push(0x81); // cp437 u-umlaut
    base.extend_from_slice(b"mfort</name></historical_figure></historical_figures></df_world>");

    let base_path = write_pair(
        dir.path(),
        &base,
        "<?xml version=\"1.0\" encoding='UTF-8'?>\n<df_world><historical_figures>\
<historical_figure><id>9</id><race>DWARF</race></historical_figure>\
</historical_figures></df_world>",
    );

    let config = ImportConfig::default();
    let catalog = Converter::new(config.clone())
        .convert_files(&InputPair::from_base(&base_path, &config))
        .unwrap();

    let figures = catalog.table("historical_figures").unwrap();
    assert_eq!(
        figures.project(&["id", "name", "race"]),
        vec![vec!["9", "urist dümfort", "DWARF"]]
    );
}

#[test]
fn test_skipped_record_does_not_stop_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_pair(
        dir.path(),
        b"<df_world><artifacts>\
            <artifact><id>1</id><name>a</name></artifact>\
            <artifact></artifact>\
            <artifact><id>2</id><name>b</name></artifact>\
          </artifacts></df_world>",
        "<df_world><artifacts/></df_world>",
    );

    let config = ImportConfig::default();
    let catalog = Converter::new(config.clone())
        .convert_files(&InputPair::from_base(&base, &config))
        .unwrap();
    assert_eq!(catalog.table("artifacts").unwrap().rows.len(), 2);
}

#[test]
fn test_structured_cells_survive_to_emission() {
    let base = r#"<df_world><sites><site>
        <id>3</id>
        <structures>
            <structure><local_id>0</local_id><type>temple</type></structure>
            <structure><local_id>1</local_id><type>market</type></structure>
        </structures>
        <civ_id>12</civ_id>
    </site></sites></df_world>"#;
    let plus = r#"<df_world><sites><site>
        <id>3</id><cur_owner_id>14</cur_owner_id>
    </site></sites></df_world>"#;

    let config = ImportConfig::default();
    let catalog = Converter::new(config.clone()).convert_str(base, plus).unwrap();
    let tables = emit(&catalog, &config);
    let sites = &tables[0];

    let kinds: Vec<_> = sites.schema.columns.iter().map(|c| c.kind.sql_type()).collect();
    assert_eq!(kinds, vec!["INTEGER PRIMARY KEY", "TEXT", "INTEGER", "INTEGER"]);

    let cell = GenericValue::from_canonical_str(&sites.rows[0].values[1]).unwrap();
    let structures = cell.get("structure").and_then(|v| v.as_list()).unwrap();
    assert_eq!(structures.len(), 2);
    assert_eq!(structures[1].get("type"), Some(&GenericValue::scalar("market")));
}

#[test]
fn test_missing_base_fails_before_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = SqlScriptSink::new(Vec::new(), "id");
    let err = import_legends(&dir.path().join("nowhere.xml"), &mut sink, &ImportConfig::default())
        .unwrap_err();

    assert!(err.is_missing_input());
    assert!(sink.into_inner().is_empty());
}

#[test]
fn test_malformed_base_emits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_pair(
        dir.path(),
        b"<df_world><regions><region><id>1</id></regions></df_world>",
        "<df_world/>",
    );

    let mut sink = SqlScriptSink::new(Vec::new(), "id");
    let err = import_legends(&base, &mut sink, &ImportConfig::default()).unwrap_err();
    assert!(matches!(err, ImportError::MalformedDocument { .. }));
    assert!(sink.into_inner().is_empty());
}

#[test]
fn test_rerun_produces_identical_script() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_pair(
        dir.path(),
        b"<df_world><entities><entity><id>1</id><group>x</group></entity></entities></df_world>",
        "<df_world><entities><entity><id>1</id><race>goblin</race></entity></entities></df_world>",
    );

    let run = || {
        let mut sink = SqlScriptSink::new(Vec::new(), "id");
        import_legends(&base, &mut sink, &ImportConfig::default()).unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    };

    let first = run();
    assert_eq!(first, run());
    assert!(first.contains("CREATE TABLE entities(id INTEGER PRIMARY KEY,grp TEXT,race TEXT);"));
    assert!(first.contains(
        "INSERT INTO entities(id,grp,race) VALUES ('1','x','goblin') \
         ON CONFLICT(id) DO UPDATE SET grp=excluded.grp,race=excluded.race;"
    ));
}

#[test]
fn test_import_into_database() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_pair(
        dir.path(),
        b"<df_world><regions>\
            <region><id>1</id><name>Foo</name><type>Forest</type></region>\
            <region><id>2</id><name>Bar</name><type>Hills</type></region>\
          </regions></df_world>",
        "<df_world><regions><region><id>2</id><evilness>40</evilness></region></regions>\
         <rivers><river><name>the sun</name></river></rivers></df_world>",
    );
    let db_path = dir.path().join("region1-legends.db");

    let mut sink = SqliteSink::open(&db_path, "id").unwrap();
    let report = import_legends(&base, &mut sink, &ImportConfig::default()).unwrap();
    assert_eq!(report.total_rows(), 3);
    drop(sink);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let (name, evilness): (String, Option<String>) = conn
        .query_row("SELECT name, evilness FROM regions WHERE id = 2", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(name, "Bar");
    assert_eq!(evilness.as_deref(), Some("40"));

    let rivers: i64 = conn
        .query_row("SELECT COUNT(*) FROM rivers", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rivers, 1);
}
