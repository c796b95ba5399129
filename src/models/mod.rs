pub mod user;
pub mod stall;
pub mod reservation;
pub mod genre;

pub use user::User;
pub use stall::Stall;
pub use reservation::Reservation;
pub use genre::Genre;
