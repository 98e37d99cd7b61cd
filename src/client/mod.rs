//! Client-side behavior of the storefront pages.

pub mod app;
pub mod catalog;
pub mod session;

pub use app::{ADMIN_PAGE, ClientApp, Console, DEVELOPER_PAGE, LOGIN_PAGE, NavVisibility, Navigation};
pub use catalog::{GridView, escape_html, filter_packages, render_grid};
pub use session::{MemoryStorage, SESSION_KEY, Session, SessionStorage};
