pub mod layout;
pub mod loader;
pub mod post_card;
pub mod post_form;
pub mod sidebar;
pub mod user;
pub mod user_list_component;
