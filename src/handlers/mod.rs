// Public (no auth) and protected (bearer token) handler tiers
pub mod health;
pub mod protected;
