use tinyorm::{
    Database, Result,
    config::{self, Config},
    orm::{Query, Table},
    params, record,
    seq::{Lecturer, Rewind, Student, UniversityClass},
};
use tracing::info;

record! {
    pub struct Person {
        name: String,
        age: i64,
    }
}

record! {
    pub struct Book {
        owner: String,
        title: String,
    }
}

record! {
    pub struct Name {
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
    type Output = Name;
}

fn roster() {
    let mut class = UniversityClass::new(
        vec![
            Lecturer::new("Maria", "Richardson", "Algorithms"),
            Lecturer::new("Bob", "Johanson", "Programming"),
        ],
        vec![
            Student::new("Andrew", "Brown"),
            Student::new("Helen", "White"),
            Student::new("George", "Johnson"),
        ],
    );

    for member in class.by_ref() {
        println!("{}", member);
    }
    println!();
    class.reset();
    for member in class.by_ref().filter(|m| m.last_name().contains('n')) {
        println!("{}", member);
    }
}

fn books(db: &Database) -> Result<()> {
    Person::create(db)?;
    Person::insert(db, params! { name = "Alice", age = 23 })?;
    Person::insert(db, params! { name = "Bob", age = 25 })?;
    Person::insert(db, params! { name = "Charlie", age = 12 })?;
    Book::create(db)?;
    Book::insert(db, params! { owner = "Alice", title = "Book 1" })?;
    Book::insert(db, params! { owner = "Alice", title = "Book 2" })?;
    Book::insert(db, params! { owner = "Bob", title = "Book 3" })?;

    for person in Person::select_records(db, &[])? {
        println!("{:?}", person);
    }
    for cutoff in [24, 30] {
        let names = YoungFolksWithBooks::bind(db, params! { cutoff = cutoff })
            .into_iter()
            .map(|r| r.map(|n| n.name))
            .collect::<Result<Vec<_>>>()?;
        println!("younger than {} with books: {:?}", cutoff, names);
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = Config::from_env()?;
    config::init_tracing(&config)?;
    info!(url = %config.url, "starting demo");

    roster();
    println!();
    books(&Database::open_url(&config.url)?)
}
