//! Account handlers: registration, login and password change.

mod change_password;
mod login_user;
mod register_user;

pub use change_password::{ChangePasswordCommand, ChangePasswordHandler};
pub use login_user::{LoginUserCommand, LoginUserHandler, LoginUserResult};
pub use register_user::{RegisterUserCommand, RegisterUserHandler, RegisterUserResult};
