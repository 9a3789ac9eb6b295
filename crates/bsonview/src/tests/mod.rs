mod malformed;
mod properties;
mod validate;
