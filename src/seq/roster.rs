use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub first_name: String,
    pub last_name: String,
}

impl Student {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lecturer {
    pub first_name: String,
    pub last_name: String,
    pub subject: String,
}

impl Lecturer {
    pub fn new(first_name: &str, last_name: &str, subject: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            subject: subject.to_string(),
        }
    }
}

/// Anyone on a class roster
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Lecturer(Lecturer),
    Student(Student),
}

impl Member {
    pub fn last_name(&self) -> &str {
        match self {
            Member::Lecturer(l) => &l.last_name,
            Member::Student(s) => &s.last_name,
        }
    }
}

impl Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Member::Lecturer(l) => write!(
                f,
                "Lecturer(first_name={}, last_name={}, subject={})",
                l.first_name, l.last_name, l.subject
            ),
            Member::Student(s) => write!(
                f,
                "Student(first_name={}, last_name={})",
                s.first_name, s.last_name
            ),
        }
    }
}

/// An iterator that can be restarted from its first item
pub trait Rewind: Iterator {
    fn reset(&mut self);
}

/// A class roster, iterated lecturers first, then students
#[derive(Debug, Clone, Default)]
pub struct UniversityClass {
    pub lecturers: Vec<Lecturer>,
    pub students: Vec<Student>,
    position: usize,
}

impl UniversityClass {
    pub fn new(lecturers: Vec<Lecturer>, students: Vec<Student>) -> Self {
        Self {
            lecturers,
            students,
            position: 0,
        }
    }

    fn member(&self, index: usize) -> Option<Member> {
        match self.lecturers.get(index) {
            Some(l) => Some(Member::Lecturer(l.clone())),
            None => self
                .students
                .get(index - self.lecturers.len())
                .cloned()
                .map(Member::Student),
        }
    }
}

impl Iterator for UniversityClass {
    type Item = Member;

    fn next(&mut self) -> Option<Member> {
        let member = self.member(self.position)?;
        self.position += 1;
        Some(member)
    }
}

impl Rewind for UniversityClass {
    fn reset(&mut self) {
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{Lecturer, Member, Rewind, Student, UniversityClass};

    fn class() -> UniversityClass {
        UniversityClass::new(
            vec![
                Lecturer::new("Maria", "Richardson", "Algorithms"),
                Lecturer::new("Bob", "Johanson", "Programming"),
            ],
            vec![
                Student::new("Andrew", "Brown"),
                Student::new("Helen", "White"),
                Student::new("George", "Johnson"),
            ],
        )
    }

    #[test]
    fn test_lecturers_then_students() {
        let names: Vec<_> = class().map(|m| m.last_name().to_string()).collect();
        assert_eq!(names, vec!["Richardson", "Johanson", "Brown", "White", "Johnson"]);
    }

    #[test]
    fn test_reset_and_filter() {
        let mut roster = class();
        assert_eq!(roster.by_ref().count(), 5);
        assert_eq!(roster.next(), None);

        roster.reset();
        let with_n: Vec<_> = roster
            .by_ref()
            .filter(|m| m.last_name().contains('n'))
            .map(|m| m.last_name().to_string())
            .collect();
        assert_eq!(with_n, vec!["Richardson", "Johanson", "Brown", "Johnson"]);

        roster.reset();
        assert!(matches!(roster.next(), Some(Member::Lecturer(_))));
    }

    #[test]
    fn test_empty_roster() {
        let mut roster = UniversityClass::default();
        assert_eq!(roster.next(), None);
        roster.reset();
        assert_eq!(roster.next(), None);
    }
}
