pub mod ballot;
pub mod election;
pub mod user;

pub use ballot::{Ballot, NewBallot};
pub use election::{Election, ElectionState, NewElection};
pub use user::{NewUser, Rights, User};
