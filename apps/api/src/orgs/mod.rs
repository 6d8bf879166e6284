// Organisation (tenant) management: creation seeds the subscription row;
// candidate and team-member writes go through the feature/limit gate.

pub mod handlers;
