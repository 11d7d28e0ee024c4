use fracture_core::db::open_db_in_memory;
use fracture_core::{ElementRepository, SqliteElementRepository, TagService, TagServiceError};
use rusqlite::{params, Connection};

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn add_tag_twice_keeps_single_tag_and_single_association() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteElementRepository::try_new(&mut conn).unwrap();
        repo.add_element("a").unwrap();
        assert!(repo.add_tag("a", "x").unwrap());
        assert!(!repo.add_tag("a", "x").unwrap());
    }

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM tags WHERE tag = 'x';"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM map_tags;"), 1);
}

#[test]
fn add_tag_for_unknown_element_creates_tag_only() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteElementRepository::try_new(&mut conn).unwrap();
        assert!(!repo.add_tag("ghost", "x").unwrap());
    }

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM tags;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM map_tags;"), 0);
}

#[test]
fn tags_for_element_returns_assigned_tags_or_empty() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteElementRepository::try_new(&mut conn).unwrap();
    repo.add_element("a").unwrap();
    repo.add_element("z").unwrap();
    repo.add_tag("a", "y").unwrap();
    repo.add_tag("a", "x").unwrap();

    assert_eq!(repo.tags_for_element("a").unwrap(), vec!["x", "y"]);
    assert!(repo.tags_for_element("z").unwrap().is_empty());
    assert!(repo.tags_for_element("missing").unwrap().is_empty());
}

#[test]
fn connect_tag_is_unguarded_against_duplicate_pairs() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteElementRepository::try_new(&mut conn).unwrap();
    repo.add_element("a").unwrap();
    repo.insert_tag("x").unwrap();

    assert!(repo.connect_tag("a", "x").unwrap());
    let err = repo.connect_tag("a", "x").unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");
}

#[test]
fn connect_tag_with_missing_side_inserts_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteElementRepository::try_new(&mut conn).unwrap();
        repo.add_element("a").unwrap();
        repo.insert_tag("x").unwrap();

        assert!(!repo.connect_tag("a", "unknown-tag").unwrap());
        assert!(!repo.connect_tag("unknown-element", "x").unwrap());
    }
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM map_tags;"), 0);
}

#[test]
fn remove_element_drops_element_tags_and_dependencies() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteElementRepository::try_new(&mut conn).unwrap();
        for identifier in ["a", "b", "c"] {
            repo.add_element(identifier).unwrap();
        }
        repo.add_tag("a", "x").unwrap();
        repo.add_tag("a", "y").unwrap();
        repo.add_tag("b", "x").unwrap();
        assert!(repo.add_dependency("a", "b").unwrap());
        assert!(repo.add_dependency("c", "a").unwrap());

        assert_eq!(repo.remove_element("a").unwrap(), 1);
        assert!(repo.get_element("a").unwrap().is_none());
        assert_eq!(repo.tags_for_element("b").unwrap(), vec!["x"]);
        assert!(repo.dependencies("c").unwrap().is_empty());
    }

    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM elements WHERE identifier = 'a';"),
        0
    );
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM map_tags;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM map_dependencies;"), 0);
    // Tags are never deleted by element removal.
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM tags;"), 2);
}

#[test]
fn remove_unknown_element_is_a_no_op() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteElementRepository::try_new(&mut conn).unwrap();
    repo.add_element("kept").unwrap();

    assert_eq!(repo.remove_element("nothing-here").unwrap(), 0);
    assert_eq!(repo.list_elements(None).unwrap().len(), 1);
}

#[test]
fn failed_remove_rolls_back_association_deletes() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteElementRepository::try_new(&mut conn).unwrap();
        for identifier in ["a", "b"] {
            repo.add_element(identifier).unwrap();
        }
        repo.add_tag("a", "x").unwrap();
        repo.add_tag("a", "y").unwrap();
        repo.add_dependency("a", "b").unwrap();
        repo.add_dependency("b", "a").unwrap();
    }
    conn.execute_batch(
        "CREATE TRIGGER block_element_delete BEFORE DELETE ON elements
         BEGIN
             SELECT RAISE(ABORT, 'element delete blocked');
         END;",
    )
    .unwrap();

    {
        let mut repo = SqliteElementRepository::try_new(&mut conn).unwrap();
        assert!(repo.remove_element("a").is_err());
        assert_eq!(repo.tags_for_element("a").unwrap(), vec!["x", "y"]);
    }

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM elements;"), 2);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM map_tags;"), 2);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM map_dependencies;"), 2);
}

#[test]
fn add_element_is_idempotent_and_keeps_surrogate_id() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteElementRepository::try_new(&mut conn).unwrap();

    let first = repo.add_element("/assets/rig.ma").unwrap();
    let second = repo.add_element("/assets/rig.ma").unwrap();
    assert_eq!(first, second);
    assert_eq!(repo.list_elements(None).unwrap(), vec![first]);
}

#[test]
fn add_elements_reports_only_new_rows() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteElementRepository::try_new(&mut conn).unwrap();
    repo.add_element("a").unwrap();

    let created = repo
        .add_elements(&["a".to_string(), "b".to_string(), "c".to_string()])
        .unwrap();
    assert_eq!(created, 2);
    assert_eq!(repo.list_elements(Some(2)).unwrap().len(), 2);
}

#[test]
fn repository_rejects_connection_without_schema() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = SqliteElementRepository::try_new(&mut conn)
        .err()
        .expect("bare connection must be rejected");
    assert!(err.to_string().contains("elements"));
}

#[test]
fn service_tag_normalizes_and_untag_removes_links() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteElementRepository::try_new(&mut conn).unwrap();
    let mut service = TagService::new(repo);
    service.add("/shots/sh010.exr").unwrap();

    let tags = service
        .tag("/shots/sh010.exr", &["Comp", " LIGHTING ", "comp"])
        .unwrap();
    assert_eq!(tags, vec!["comp", "lighting"]);

    let retried = service.tag("/shots/sh010.exr", &["comp"]).unwrap();
    assert_eq!(retried, vec!["comp", "lighting"]);

    assert_eq!(service.untag("/shots/sh010.exr", &["COMP", "absent"]).unwrap(), 1);
    assert_eq!(service.tags("/shots/sh010.exr").unwrap(), vec!["lighting"]);
    // Untagging keeps the tag row and never creates unknown tags.
    assert_eq!(service.all_tags().unwrap(), vec!["comp", "lighting"]);
}

#[test]
fn add_tags_counts_new_links_in_one_call() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteElementRepository::try_new(&mut conn).unwrap();
    repo.add_element("a").unwrap();
    repo.add_tag("a", "x").unwrap();

    let tags = ["x", "y", "z"].map(String::from);
    assert_eq!(repo.add_tags("a", &tags).unwrap(), 2);
    assert_eq!(repo.tags_for_element("a").unwrap(), vec!["x", "y", "z"]);
}

#[test]
fn service_tag_writes_nothing_when_one_tag_fails() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER block_boom_tag BEFORE INSERT ON tags
         WHEN NEW.tag = 'boom'
         BEGIN
             SELECT RAISE(ABORT, 'tag blocked');
         END;",
    )
    .unwrap();

    {
        let repo = SqliteElementRepository::try_new(&mut conn).unwrap();
        let mut service = TagService::new(repo);
        service.add("a").unwrap();

        let err = service.tag("a", &["alpha", "boom"]).unwrap_err();
        assert!(matches!(err, TagServiceError::Repo(_)));
        assert!(service.tags("a").unwrap().is_empty());
    }

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM tags;"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM map_tags;"), 0);
}

#[test]
fn service_rejects_blank_tags_and_identifiers() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteElementRepository::try_new(&mut conn).unwrap();
    let mut service = TagService::new(repo);

    assert!(matches!(
        service.add("   ").unwrap_err(),
        TagServiceError::InvalidIdentifier(_)
    ));
    service.add("a").unwrap();
    assert!(matches!(
        service.tag("a", &["ok", ""]).unwrap_err(),
        TagServiceError::InvalidTag(_)
    ));
    assert!(service.tags("a").unwrap().is_empty());
}

#[test]
fn service_remove_reports_whether_element_existed() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteElementRepository::try_new(&mut conn).unwrap();
    let mut service = TagService::new(repo);
    service.add("a").unwrap();
    service.add("b").unwrap();
    assert!(service.require("a", "b").unwrap());
    assert_eq!(service.requirements("a").unwrap(), vec!["b"]);

    assert!(service.remove("b").unwrap());
    assert!(!service.remove("b").unwrap());
    assert!(service.requirements("a").unwrap().is_empty());
}

#[test]
fn dependencies_on_unknown_elements_are_ignored() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteElementRepository::try_new(&mut conn).unwrap();
        repo.add_element("a").unwrap();
        assert!(!repo.add_dependency("a", "missing").unwrap());
        assert!(repo.dependencies("missing").unwrap().is_empty());
    }
    let rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM map_dependencies WHERE element_id = ?1;",
            params![1],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(rows, 0);
}
