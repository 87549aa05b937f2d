pub mod contour;
pub mod descent;
pub mod pursuit;
