//! Expense domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, FieldErrors, Result};

/// Largest accepted amount. Amounts are stored as JSON floats, and anything
/// above this stops reading back as the same decimal.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0); // 1_000_000_000_000_000 (1e15)

/// Fixed expense categories, serialized by their display label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Dining")]
    FoodAndDining,
    Transportation,
    Entertainment,
    Housing,
    Utilities,
    Healthcare,
    Shopping,
    Travel,
    Education,
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::FoodAndDining,
        Category::Transportation,
        Category::Entertainment,
        Category::Housing,
        Category::Utilities,
        Category::Healthcare,
        Category::Shopping,
        Category::Travel,
        Category::Education,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::FoodAndDining => "Food & Dining",
            Category::Transportation => "Transportation",
            Category::Entertainment => "Entertainment",
            Category::Housing => "Housing",
            Category::Utilities => "Utilities",
            Category::Healthcare => "Healthcare",
            Category::Shopping => "Shopping",
            Category::Travel => "Travel",
            Category::Education => "Education",
            Category::Other => "Other",
        }
    }

    /// Short form accepted on the command line ("food", "transportation", ...)
    pub fn slug(&self) -> &'static str {
        match self {
            Category::FoodAndDining => "food",
            Category::Transportation => "transportation",
            Category::Entertainment => "entertainment",
            Category::Housing => "housing",
            Category::Utilities => "utilities",
            Category::Healthcare => "healthcare",
            Category::Shopping => "shopping",
            Category::Travel => "travel",
            Category::Education => "education",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Accepts the display label or the slug, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.label().to_lowercase() == wanted || c.slug() == wanted)
            .ok_or_else(|| Error::validation(format!("Unknown category: {}", s.trim())))
    }
}

/// A single expense owned by the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub title: String,
    /// Stored as a JSON number
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: Category,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Create a new expense with a fresh id
    pub fn new(
        title: impl Into<String>,
        amount: Decimal,
        category: Category,
        date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            amount,
            category,
            date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Raw expense form input, validated before it becomes an [`Expense`]
#[derive(Debug, Clone, Default)]
pub struct ExpenseDraft {
    pub title: String,
    pub amount: String,
    pub category: Option<String>,
    /// Defaults to "now" when absent
    pub date: Option<DateTime<Utc>>,
}

impl ExpenseDraft {
    /// Prefill a draft from an existing record (edit form)
    pub fn from_expense(expense: &Expense) -> Self {
        Self {
            title: expense.title.clone(),
            amount: expense.amount.to_string(),
            category: Some(expense.category.label().to_string()),
            date: Some(expense.date),
        }
    }

    /// Validate every field, collecting one message per bad field
    pub fn validate(&self) -> std::result::Result<(String, Decimal, Category), FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.insert("title", "Title is required");
        }

        let amount_input = self.amount.trim();
        let amount = if amount_input.is_empty() {
            errors.insert("amount", "Amount is required");
            None
        } else {
            match parse_amount(amount_input) {
                Some(a) if a > MAX_AMOUNT => {
                    errors.insert("amount", "Amount is too large");
                    None
                }
                Some(a) if a > Decimal::ZERO => Some(a),
                _ => {
                    errors.insert("amount", "Amount must be a positive number");
                    None
                }
            }
        };

        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => {
                errors.insert("category", "Category is required");
                None
            }
            Some(raw) => match raw.parse::<Category>() {
                Ok(c) => Some(c),
                Err(e) => {
                    errors.insert("category", e.to_string());
                    None
                }
            },
        };

        match (amount, category) {
            (Some(amount), Some(category)) if errors.is_empty() => {
                Ok((title.to_string(), amount, category))
            }
            _ => Err(errors),
        }
    }

    /// Turn the draft into a record.
    ///
    /// With `existing`, the id and creation time are kept and only
    /// `updated_at` moves forward.
    pub fn into_expense(self, existing: Option<&Expense>, now: DateTime<Utc>) -> Result<Expense> {
        let (title, amount, category) = self.validate().map_err(Error::InvalidFields)?;
        let date = self.date.unwrap_or(now);

        Ok(match existing {
            Some(prev) => Expense {
                id: prev.id,
                title,
                amount,
                category,
                date,
                created_at: prev.created_at,
                updated_at: now,
            },
            None => Expense::new(title, amount, category, date, now),
        })
    }
}

fn parse_amount(input: &str) -> Option<Decimal> {
    Decimal::from_str(input)
        .or_else(|_| Decimal::from_scientific(input))
        .ok()
}

/// Title search plus optional category, as used by the expense list
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub search: Option<String>,
    pub category: Option<Category>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                expense.title.to_lowercase().contains(&term.to_lowercase())
            }
            _ => true,
        };
        let matches_category = self.category.map_or(true, |c| expense.category == c);
        matches_search && matches_category
    }
}

/// Totals over a list of expenses
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpenseSummary {
    pub count: usize,
    pub total: Decimal,
    /// Category totals in category order, only non-empty categories
    pub by_category: Vec<(Category, Decimal)>,
}

impl ExpenseSummary {
    pub fn from_expenses<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Self {
        let mut totals: std::collections::BTreeMap<Category, Decimal> = Default::default();
        let mut count = 0;
        let mut total = Decimal::ZERO;

        for expense in expenses {
            count += 1;
            total = total.saturating_add(expense.amount);
            let slot = totals.entry(expense.category).or_insert(Decimal::ZERO);
            *slot = slot.saturating_add(expense.amount);
        }

        Self {
            count,
            total,
            by_category: totals.into_iter().collect(),
        }
    }
}
