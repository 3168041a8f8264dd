#[cfg(test)]
pub mod static_accounts;
pub mod system_accounts;
