//! Catalog entities: books and authors.

use chrono::{DateTime, NaiveDate, Utc};
use common::{AuthorId, Isbn};
use serde::{Deserialize, Serialize};

use crate::{DomainError, order::Money};

/// A book in the catalog, keyed by its ISBN-like catalog code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: Isbn,
    pub title: String,
    pub price: Money,
    /// Copies currently in stock.
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<AuthorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Creates a new book with validated fields.
    pub fn new(
        isbn: impl Into<Isbn>,
        title: impl Into<String>,
        price: Money,
    ) -> Result<Self, DomainError> {
        let now = Utc::now();
        let book = Self {
            isbn: isbn.into(),
            title: title.into(),
            price,
            stock: 0,
            synopsis: None,
            category: "Général".to_string(),
            published_on: None,
            author_id: None,
            created_at: now,
            updated_at: now,
        };
        book.check()?;
        Ok(book)
    }

    /// Validates the invariant fields after construction or update.
    pub fn check(&self) -> Result<(), DomainError> {
        if self.isbn.is_empty() {
            return Err(DomainError::validation("isbn is required"));
        }
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        if self.price.is_negative() {
            return Err(DomainError::validation("price must not be negative"));
        }
        Ok(())
    }
}

/// An author; one author has zero or more books via a non-owning
/// back-reference on the book side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Author {
    /// Creates a new author with a validated name.
    pub fn new(last_name: impl Into<String>) -> Result<Self, DomainError> {
        let last_name = last_name.into();
        if last_name.trim().is_empty() {
            return Err(DomainError::validation("author name is required"));
        }
        let now = Utc::now();
        Ok(Self {
            id: AuthorId::new(),
            last_name,
            first_name: None,
            biography: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Full display name, "First Last" when a first name is known.
    pub fn display_name(&self) -> String {
        match &self.first_name {
            Some(first) => format!("{first} {}", self.last_name),
            None => self.last_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_new_applies_defaults() {
        let book = Book::new("978-2-07-040850-4", "L'Étranger", Money::from_cents(890)).unwrap();
        assert_eq!(book.category, "Général");
        assert_eq!(book.stock, 0);
        assert!(book.author_id.is_none());
    }

    #[test]
    fn book_rejects_empty_title() {
        assert!(Book::new("978-1", "  ", Money::from_cents(100)).is_err());
    }

    #[test]
    fn book_rejects_negative_price() {
        assert!(Book::new("978-1", "Titre", Money::from_cents(-1)).is_err());
    }

    #[test]
    fn book_rejects_empty_isbn() {
        assert!(Book::new("", "Titre", Money::from_cents(100)).is_err());
    }

    #[test]
    fn author_display_name() {
        let mut author = Author::new("Camus").unwrap();
        assert_eq!(author.display_name(), "Camus");
        author.first_name = Some("Albert".into());
        assert_eq!(author.display_name(), "Albert Camus");
    }

    #[test]
    fn author_requires_name() {
        assert!(Author::new("").is_err());
    }
}
