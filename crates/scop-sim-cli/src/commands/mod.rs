pub mod cooperative;
pub mod corporate_tax;
pub mod sensitivity;
