/// Binds a model to its collection.
///
/// # Example
///
/// ```ignore
/// define_table!("videos" : Video = id);
/// ```
#[macro_export]
macro_rules! define_table {
    ($table:literal : $model:ty = $id:ident) => {
        impl $crate::database::Table for $model {
            fn table() -> &'static str {
                $table
            }

            fn id(&self) -> &$crate::database::Record<Self> {
                &self.$id
            }
        }
    };
}
