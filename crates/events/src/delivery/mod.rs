//! External delivery channels for firmware notifications.

pub mod push;
