//! Session engine and its dispatch surface.

pub mod dispatch;
pub mod games;
pub mod locks;


#[cfg(test)]
mod tests_games;
