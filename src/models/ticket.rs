use chrono::{DateTime, Utc};
use serde::Serialize;

/// Receipt handed to a buyer after a sale.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub brand: String,
    pub name: String,
    pub phone: String,
    pub package_name: String,
    pub username: String,
    pub password: String,
    pub reference: String,
    pub issued_at: DateTime<Utc>,
}

impl Ticket {
    pub fn file_name(&self) -> String {
        format!("Ticket-{}.txt", self.reference)
    }

    pub fn sms_message(&self) -> String {
        format!(
            "Hello {}, your WiFi access is ready!\nPackage: {}\nUsername: {}\nPassword: {}\nReference: {}\nThank you for choosing {}.",
            self.name, self.package_name, self.username, self.password, self.reference, self.brand
        )
    }

    pub fn render_text(&self) -> String {
        let lines = [
            format!("{} – Access Ticket", self.brand),
            String::new(),
            format!("Name: {}", self.name),
            format!("Phone: {}", self.phone),
            format!("Package: {}", self.package_name),
            format!("Username: {}", self.username),
            format!("Password: {}", self.password),
            format!("Reference: {}", self.reference),
            format!("Date: {}", self.issued_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ];
        lines.join("\n")
    }
}
