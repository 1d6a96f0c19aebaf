// Handlers behind the bearer-token middleware (/routes/*)
pub mod admin_users;
pub mod auth;
pub mod cases;
pub mod exports;
pub mod sync;

pub use admin_users::{create_firebase_user, list_firebase_users};
pub use auth::{me_admin, minimal_auth_works};
pub use cases::{get_repair_case, list_cases};
pub use exports::{export_cases_csv, export_old_cases_excel, export_partner_cases_excel};
pub use sync::{sync_status, test_single_sync, trigger_sync};
