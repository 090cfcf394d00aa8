pub mod db;
pub mod html;
pub mod reflections;
pub mod table_page;
pub mod whatsapp;
pub mod zen_quotes;

pub use db::DbAdapter;
pub use reflections::ReflectionsFileSource;
pub use table_page::{RetryPolicy, TableLayout, TablePageSource};
pub use whatsapp::WhatsAppAdapter;
pub use zen_quotes::ZenQuotesAdapter;
