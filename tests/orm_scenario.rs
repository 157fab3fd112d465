use tinyorm::{
    Database, Error, Result,
    orm::{Query, Record, Table},
    params, record,
    sql::types::{Row, Value},
};

record! {
    struct Person {
        name: String,
        age: i64,
    }
}

record! {
    struct Book {
        owner: String,
        title: String,
    }
}

record! {
    struct OwnerName {
        name: String,
    }
}

struct YoungFolksWithBooks;

impl Query for YoungFolksWithBooks {
    const SQL: &'static str = "
        SELECT DISTINCT    -- any person owning any books
            Person.name
        FROM Person
        JOIN Book
            ON Book.owner = Person.name
        WHERE age < :cutoff
    ";
    type Output = OwnerName;
}

fn testdb() -> Result<Database> {
    Database::open("memory://")
}

/// Three people, two of whom own books
fn scenario() -> Result<Database> {
    let db = testdb()?;
    Person::create(&db)?;
    Person::insert(&db, params! { name = "Alice", age = 23 })?;
    Person::insert(&db, params! { name = "Bob", age = 25 })?;
    Person::insert(&db, params! { name = "Charlie", age = 12 })?;
    Book::create(&db)?;
    Book::insert(&db, params! { owner = "Alice", title = "Book 1" })?;
    Book::insert(&db, params! { owner = "Alice", title = "Book 2" })?;
    Book::insert(&db, params! { owner = "Bob", title = "Book 3" })?;
    Ok(db)
}

fn row(name: &str, age: i64) -> Row {
    vec![Value::from(name), Value::from(age)]
}

fn young_folks(db: &Database, cutoff: i64) -> Result<Vec<OwnerName>> {
    YoungFolksWithBooks::bind(db, params! { cutoff = cutoff })
        .into_iter()
        .collect()
}

#[test]
fn test_check_engine() -> Result<()> {
    let db = scenario()?;
    let (columns, _) = db
        .execute("SELECT * FROM Person", &params! {})?
        .into_rows()
        .unwrap_or_default();
    assert_eq!(columns.len(), Person::FIELDS.len());
    Ok(())
}

#[test]
fn test_everybody() -> Result<()> {
    let db = scenario()?;
    assert_eq!(
        Person::select(&db, &[])?,
        vec![row("Alice", 23), row("Bob", 25), row("Charlie", 12)]
    );
    Ok(())
}

#[test]
fn test_select_with_where_clause() -> Result<()> {
    let db = scenario()?;
    assert_eq!(Person::select(&db, &["age > 24"])?, vec![row("Bob", 25)]);
    assert_eq!(
        Person::select(&db, &["age > 10", "name <> 'Bob'"])?,
        vec![row("Alice", 23), row("Charlie", 12)]
    );
    Ok(())
}

#[test]
fn test_queries_are_iterable() -> Result<()> {
    let db = scenario()?;
    let these = YoungFolksWithBooks::bind(&db, params! { cutoff = 24 });
    let collected = these.into_iter().collect::<Result<Vec<_>>>()?;
    assert_eq!(collected.len(), 1);
    Ok(())
}

#[test]
fn test_select_with_books() -> Result<()> {
    let db = scenario()?;
    let names: Vec<String> = young_folks(&db, 24)?.into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Alice".to_string()]);
    assert_eq!(
        young_folks(&db, 30)?,
        vec![
            OwnerName {
                name: "Alice".into()
            },
            OwnerName { name: "Bob".into() },
        ]
    );
    Ok(())
}

#[test]
fn test_rebinding_runs_again() -> Result<()> {
    let db = scenario()?;
    assert_eq!(young_folks(&db, 30)?.len(), 2);
    Person::insert(&db, params! { name = "Dora", age = 20 })?;
    Book::insert(&db, params! { owner = "Dora", title = "Book 4" })?;
    assert_eq!(young_folks(&db, 30)?.len(), 3);
    Ok(())
}

#[test]
fn test_select_records_round_trip() -> Result<()> {
    let db = scenario()?;
    let people = Person::select_records(&db, &["age < :max"]);
    // Placeholders need select_with.
    assert!(matches!(people, Err(Error::Parse(_))));

    let kids = Person::select_with(&db, &["age < :max"], &params! { max = 18 })?;
    assert_eq!(kids, vec![row("Charlie", 12)]);

    let books = Book::select_records(&db, &["owner = 'Alice'"])?;
    let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Book 1", "Book 2"]);
    Ok(())
}

#[test]
fn test_create_twice_is_schema_error() -> Result<()> {
    let db = scenario()?;
    assert!(matches!(Person::create(&db), Err(Error::Schema(_))));
    Ok(())
}

#[test]
fn test_invalid_insert_stores_nothing() -> Result<()> {
    let db = scenario()?;
    assert!(matches!(
        Person::insert(&db, params! { name = "Eve", age = "old" }),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        Person::insert(&db, params! { name = "Eve", age = 30, email = "e@x" }),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        Person::insert(&db, params! { name = "Eve" }),
        Err(Error::Validation(_))
    ));
    assert_eq!(Person::select(&db, &[])?.len(), 3);
    Ok(())
}

#[test]
fn test_failed_statement_rolls_back() -> Result<()> {
    let db = scenario()?;
    assert!(matches!(
        db.execute(
            "INSERT INTO Person VALUES ('Eve', 30), ('Mallory', 'old')",
            &params! {}
        ),
        Err(Error::Validation(_))
    ));
    assert_eq!(Person::select(&db, &[])?.len(), 3);
    Ok(())
}

#[test]
fn test_misaligned_output_is_reported() -> Result<()> {
    struct Everyone;

    impl Query for Everyone {
        const SQL: &'static str = "SELECT * FROM Person";
        type Output = OwnerName;
    }

    let db = scenario()?;
    let mut iter = Everyone::bind(&db, params! {}).into_iter();
    assert!(matches!(iter.next(), Some(Err(Error::Validation(_)))));
    Ok(())
}

#[test]
fn test_disk_store_persists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let url = format!("file://{}", dir.path().join("people.db").display());
    {
        let db = Database::open(&url)?;
        Person::create(&db)?;
        Person::insert(&db, params! { name = "Alice", age = 23 })?;
    }

    let db = Database::open(&url)?;
    assert_eq!(Person::select(&db, &[])?, vec![row("Alice", 23)]);
    assert!(matches!(Person::create(&db), Err(Error::Schema(_))));
    Ok(())
}

record! {
    struct Reading {
        value: f64,
    }
}

#[test]
fn test_nan_is_rejected_and_order_by_float_works() -> Result<()> {
    let db = testdb()?;
    Reading::create(&db)?;
    for i in 0..60 {
        let value = if i % 3 == 0 { f64::NAN } else { (60 - i) as f64 / 4.0 };
        let inserted = Reading::insert(&db, params! { value = value });
        if i % 3 == 0 {
            assert!(matches!(inserted, Err(Error::Validation(_))));
        } else {
            inserted?;
        }
    }
    db.execute("INSERT INTO Reading VALUES (7), (NULL)", &params! {})?;

    let (_, rows) = db
        .execute("SELECT * FROM Reading ORDER BY value", &params! {})?
        .into_rows()
        .unwrap_or_default();
    assert_eq!(rows.len(), 42);
    assert_eq!(rows[0], vec![Value::Null]);
    let values: Vec<f64> = rows[1..]
        .iter()
        .map(|r| match r[0] {
            Value::Float(f) => f,
            ref v => panic!("unexpected value {:?}", v),
        })
        .collect();
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert!(values.contains(&7.0));

    let small = Reading::select(&db, &["value < 1"])?;
    assert_eq!(small.len(), 2);
    Ok(())
}
