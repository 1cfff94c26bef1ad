//! Dependencies shared by the prism crates. Re-exporting them from one place keeps
//! the versions aligned across the workspace.

pub use ahash;
pub use chrono;
pub use derive_new;
pub use indoc;
pub use itertools;
pub use log;
pub use maplit;
pub use pathdiff;
pub use thiserror;
pub use walkdir;

/// Name of the function this macro is called in
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        &name[..name.len() - 3]
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn function_name_of_test() {
        assert_eq!(crate::function_name!(), "prism_shared::tests::function_name_of_test");
    }
}
