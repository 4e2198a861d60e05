// Who is drawing: captured once, used for the greeting only.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("Please type your name to practice!")]
    MissingName,
    #[error("Enter 10 numbers for your family contact!")]
    BadPhone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProfile {
    pub name: String,
    pub phone: String,
}

impl SessionProfile {
    /// Name must be non-blank. The phone keeps its digits only (separators are
    /// dropped, anything past ten digits is cut) and must then be ten long.
    pub fn new(name: &str, phone: &str) -> Result<Self, ProfileError> {
        if name.trim().is_empty() {
            return Err(ProfileError::MissingName);
        }
        let digits: String = phone.chars().filter(char::is_ascii_digit).take(10).collect();
        if digits.len() != 10 {
            return Err(ProfileError::BadPhone);
        }
        Ok(Self { name: name.trim().to_string(), phone: digits })
    }

    /// Phone with all but the last four digits hidden, for logs.
    pub fn contact_hint(&self) -> String {
        let (hidden, shown) = self.phone.split_at(self.phone.len().saturating_sub(4));
        format!("{}{}", "*".repeat(hidden.len()), shown)
    }

    pub fn greeting(&self) -> String {
        format!("Hi {}!", self.name)
    }
}
