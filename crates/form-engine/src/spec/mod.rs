pub mod de;
pub mod field;
pub mod template;

pub use field::{
    FieldDefinition, FieldOption, FieldType, FieldWidth, RatingConfig, RatingStyle, SliderConfig,
};
pub use template::{FormTemplate, TemplateDocument};
