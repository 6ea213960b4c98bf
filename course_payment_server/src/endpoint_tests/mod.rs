mod admin;
mod checkout;
mod mocks;
mod orders;
