pub mod auth;
pub mod bot;
pub mod debts;
pub mod health;
pub mod receipts;
pub mod transactions;
pub mod users;
pub mod wallets;
