pub mod debug;
pub mod plausible;
pub mod vercel;
