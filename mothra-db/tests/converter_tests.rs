//! Converter tests over a small mutagenesis-style context
//!
//! molecule 1--* atom *--1 atom_type

use mothra_common::workflow::FromInput;
use mothra_common::{Error, InputDict};
use mothra_db::converters::{
    AlephConverter, OrangeConverter, PrdFctConverter, RsdConverter, TreeLikerConverter,
};
use mothra_db::library::{self, AlephConverterRequest};
use mothra_db::{
    ColumnInfo, ContextSelection, DbContext, DbSchema, DiscretizationIntervals, LinkKind,
    Relation, TableData,
};
use serde_json::json;
use std::collections::BTreeMap;

fn columns(names: &[&str]) -> Vec<ColumnInfo> {
    names
        .iter()
        .map(|n| ColumnInfo {
            name: n.to_string(),
            data_type: "varchar".to_string(),
        })
        .collect()
}

fn rows(values: &[&[Option<&str>]]) -> Vec<Vec<Option<String>>> {
    values
        .iter()
        .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
        .collect()
}

fn molecule_context() -> DbContext {
    let mut cols = BTreeMap::new();
    cols.insert("molecule".to_string(), columns(&["id", "logp", "class"]));
    cols.insert(
        "atom".to_string(),
        columns(&["id", "molecule_id", "atom_type_id", "charge"]),
    );
    cols.insert("atom_type".to_string(), columns(&["id", "name"]));

    let mut pks = BTreeMap::new();
    for t in ["molecule", "atom", "atom_type"] {
        pks.insert(t.to_string(), "id".to_string());
    }

    let schema = DbSchema {
        tables: vec![
            "atom".to_string(),
            "atom_type".to_string(),
            "molecule".to_string(),
        ],
        columns: cols,
        primary_keys: pks,
        relations: vec![
            Relation::new("atom", "molecule_id", "molecule", "id"),
            Relation::new("atom", "atom_type_id", "atom_type", "id"),
        ],
    };

    let mut data = BTreeMap::new();
    data.insert(
        "molecule".to_string(),
        TableData::new(
            vec!["id".into(), "logp".into(), "class".into()],
            rows(&[
                &[Some("d1"), Some("4.23"), Some("pos")],
                &[Some("d2"), Some("1.5"), Some("neg")],
                &[Some("d3"), Some("2.0"), Some("pos")],
            ]),
        ),
    );
    data.insert(
        "atom".to_string(),
        TableData::new(
            vec![
                "id".into(),
                "molecule_id".into(),
                "atom_type_id".into(),
                "charge".into(),
            ],
            rows(&[
                &[Some("a1"), Some("d1"), Some("t1"), Some("-0.1")],
                &[Some("a2"), Some("d1"), Some("t2"), Some("0.3")],
                &[Some("a3"), Some("d2"), Some("t1"), None],
            ]),
        ),
    );
    data.insert(
        "atom_type".to_string(),
        TableData::new(
            vec!["id".into(), "name".into()],
            rows(&[&[Some("t1"), Some("c")], &[Some("t2"), Some("O")]]),
        ),
    );

    let selection = ContextSelection {
        target_table: "molecule".to_string(),
        target_att: Some("class".to_string()),
        ..Default::default()
    };
    DbContext::assemble("mutagenesis", &schema, &selection, data).unwrap()
}

fn no_intervals() -> DiscretizationIntervals {
    DiscretizationIntervals::new()
}

#[test]
fn test_traversal_covers_both_link_kinds() {
    let ctx = molecule_context();
    let links = ctx.traversal();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].child, "atom");
    assert_eq!(links[0].kind, LinkKind::OneToMany);
    assert_eq!(links[1].child, "atom_type");
    assert_eq!(links[1].kind, LinkKind::ManyToOne);
}

#[test]
fn test_rsd_examples_and_background() {
    let ctx = molecule_context();
    let intervals = no_intervals();
    let rsd = RsdConverter::new(&ctx, &intervals).unwrap();

    assert_eq!(
        rsd.all_examples(),
        "target(pos, d1).\ntarget(neg, d2).\ntarget(pos, d3).\n"
    );

    let bk = rsd.background_knowledge();
    assert!(bk.contains(":- modeh(1, target(#class, +molecule))."));
    assert!(bk.contains(":- modeb(*, has_atom(+molecule, -atom))."));
    assert!(bk.contains(":- modeb(1, has_atom_type(+atom, -atom_type))."));
    assert!(bk.contains(":- modeb(1, atom_charge(+atom, #atom_charge))."));
    assert!(bk.contains("has_atom(d1, a1)."));
    assert!(bk.contains("has_atom_type(a2, t2)."));
    assert!(bk.contains("atom_type_name(t2, 'O')."));
    assert!(bk.contains("molecule_logp(d1, 4.23)."));
    // keys and the class are not attributes
    assert!(!bk.contains("molecule_class("));
    assert!(!bk.contains("atom_molecule_id("));
}

#[test]
fn test_discretized_values() {
    let ctx = molecule_context();
    let intervals = DiscretizationIntervals::new()
        .with("molecule", "logp", vec![2.0])
        .unwrap();
    let rsd = RsdConverter::new(&ctx, &intervals).unwrap();
    let bk = rsd.background_knowledge();
    assert!(bk.contains("molecule_logp(d1, '>2')."));
    assert!(bk.contains("molecule_logp(d3, '=<2')."));
}

#[test]
fn test_aleph_splits_examples() {
    let ctx = molecule_context();
    let intervals = no_intervals();
    let aleph = AlephConverter::new(&ctx, "pos", &intervals).unwrap();

    assert_eq!(aleph.positive_examples(), "target(d1).\ntarget(d3).\n");
    assert_eq!(aleph.negative_examples(), "target(d2).\n");
    let bk = aleph.background_knowledge();
    assert!(bk.contains(":- modeh(1, target(+molecule))."));
    assert!(bk.contains(":- determination(target/1, has_atom/2)."));
}

#[test]
fn test_aleph_requires_target_value_before_conversion() {
    // The context is deliberately malformed: the value check must fail first
    let input = InputDict::new()
        .with("target_att_val", "")
        .with("context", json!("not a context"));
    let err = AlephConverterRequest::from_input(&input).err().unwrap();
    assert_eq!(
        err.to_string(),
        "Invalid input: Please specify a target attribute value."
    );

    let ctx = molecule_context();
    let intervals = no_intervals();
    assert!(matches!(
        AlephConverter::new(&ctx, "", &intervals),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_treeliker_dataset_sorted_by_class() {
    let ctx = molecule_context();
    let intervals = no_intervals();
    let treeliker = TreeLikerConverter::new(&ctx, &intervals).unwrap();

    let dataset = treeliker.dataset();
    let lines: Vec<&str> = dataset.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("neg molecule_logp(d2, 1.5)"));
    assert!(lines[1].starts_with("pos molecule_logp(d1, 4.23)"));
    assert!(lines[1].contains("has_atom(d1, a2), "));
    assert!(lines[1].contains("atom_type_name(t2, 'O')"));
    assert!(lines[2].starts_with("pos molecule_logp(d3, 2.0)"));

    let template = treeliker.default_template();
    assert!(template.starts_with("[molecule_logp(+molecule, #molecule_logp), "));
    assert!(template.contains("has_atom(+molecule, -atom)"));
    assert!(template.ends_with("]"));
}

#[test]
fn test_orange_tab_layout() {
    let ctx = molecule_context();
    let orange = OrangeConverter::new(&ctx);

    let target = orange.target_table_dataset();
    assert_eq!(target.name, "molecule");
    let lines: Vec<&str> = target.tab.lines().collect();
    assert_eq!(lines[0], "id\tlogp\tclass");
    assert_eq!(lines[1], "string\tc\td");
    assert_eq!(lines[2], "meta\t\tclass");
    assert_eq!(lines[3], "d1\t4.23\tpos");

    let others = orange.other_table_datasets();
    assert_eq!(others.len(), 2);
    let atom = others.iter().find(|d| d.name == "atom").unwrap();
    assert!(atom.tab.contains("a3\td2\tt1\t?"));
}

#[test]
fn test_prd_fct_contents_and_files() {
    let ctx = molecule_context();
    let converter = PrdFctConverter::new(&ctx);

    let prd = converter.create_prd_file();
    assert!(prd.starts_with("--INDIVIDUAL\nmolecule 1 molecule cwa\n--STRUCTURAL\n"));
    assert!(prd.contains("molecule2atom 2 1:molecule *:atom 1 li"));
    assert!(prd.contains("atom2atom_type 2 *:atom 1:atom_type 1 li"));
    assert!(prd.contains("class 2 molecule #class 1 cwa"));

    let fct = converter.create_fct_file();
    assert!(fct.starts_with("!molecule\nd1\nd2\nd3\n"));
    assert!(fct.contains("!molecule2atom\nd1,a1\nd1,a2\nd2,a3\n"));
    assert!(fct.contains("!class\nd1,pos\nd2,neg\nd3,pos\n"));

    let root = tempfile::tempdir().unwrap();
    let (prd_path, fct_path) = converter.write_files(root.path()).unwrap();
    assert!(prd_path.starts_with(root.path()));
    assert_eq!(prd_path.parent(), fct_path.parent());
    let name = prd_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("prdFctTemp") && name.ends_with(".prd"));
    assert_eq!(std::fs::read_to_string(&fct_path).unwrap(), fct);
}

#[test]
fn test_converter_components_through_input_dicts() {
    let ctx = molecule_context();
    let input = InputDict::new()
        .with("context", serde_json::to_value(&ctx).unwrap())
        .with("dump", "true")
        .with("discr_intervals", json!({"atom": {"charge": [0.0]}}));

    let out = library::mysql_rsd_converter(&input).unwrap();
    let bk = out.get("bk").unwrap().as_str().unwrap();
    assert!(bk.contains("atom_charge(a1, '=<0')."));

    let out = library::mysql_orange_converter(&input).unwrap();
    assert_eq!(out.get("target_table_dataset").unwrap()["name"], "molecule");

    let bad = input.clone().with("discr_intervals", json!({"atom": {"charge": [1.0, 0.0]}}));
    assert!(library::mysql_treeliker_converter(&bad).is_err());

    assert_eq!(
        library::mysql_db_context(&InputDict::new()).unwrap().get("context"),
        Some(&json!(null))
    );
    assert_eq!(
        library::mysql_query_to_odt(&InputDict::new()).unwrap().get("dataset"),
        Some(&json!(null))
    );
}

#[test]
fn test_connect_rejects_unknown_vendor() {
    let input = InputDict::new()
        .with("vendor", "oracle")
        .with("host", "localhost")
        .with("database", "d")
        .with("user", "u")
        .with("password", "p");
    let err = library::ConnectRequest::from_input(&input).err().unwrap();
    assert!(err.is_client_error());
}

#[test]
fn test_context_without_target_rows_is_invalid_input() {
    let input = InputDict::new().with(
        "context",
        json!({
            "target_table": "molecule",
            "target_att": "class",
            "pkeys": {"molecule": "id"},
            "data": {}
        }),
    );
    for convert in [
        library::mysql_rsd_converter,
        library::mysql_treeliker_converter,
        library::mysql_orange_converter,
    ] {
        let err = convert(&input).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{}", err);
    }
}
