/// Declare a struct bound from one group of a config file.
///
/// ```
/// groupconf::conf_group! {
///     /// The `[Icon]` group, with lowercase keys.
///     #[group = "Icon"]
///     pub struct GroupIcon {
///         #[conf = "icon"]
///         pub icon: String,
///         #[conf = "name"]
///         pub name: String,
///         pub debug: bool,
///     }
/// }
/// ```
///
/// Every field type must implement [`crate::FromConfValue`] and `Default`.
#[macro_export]
macro_rules! conf_group {
    (
        $(#[doc = $doc:expr])*
        #[group = $group:literal]
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $fdoc:expr])*
                $(#[conf = $key:literal])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[doc = $fdoc])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::ConfGroup for $name {
            const GROUP: &'static str = $group;

            fn bind_fields(&mut self, binder: &mut $crate::Binder<'_>) {
                $(
                    binder.bind_field(
                        <Self as $crate::ConfGroup>::GROUP,
                        stringify!($field),
                        $crate::conf_group!(@tag $($key)?),
                        &mut self.$field,
                    );
                )*
            }
        }
    };
    (@tag $key:literal) => { Some($key) };
    (@tag) => { None };
}

/// Declare a record made of groups declared with [`conf_group!`].
///
/// ```
/// groupconf::conf_group! {
///     #[group = "Configuration"]
///     pub struct GroupConfiguration {
///         pub interval: i32,
///     }
/// }
///
/// groupconf::conf_record! {
///     pub struct AppletConf {
///         pub configuration: GroupConfiguration,
///     }
/// }
///
/// let bound = groupconf::from_str::<AppletConf>("[Configuration]\ninterval=4", Default::default()).unwrap();
/// assert_eq!(bound.record.configuration.interval, 4);
/// ```
#[macro_export]
macro_rules! conf_record {
    (
        $(#[doc = $doc:expr])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $fdoc:expr])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[doc = $fdoc])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::ConfRecord for $name {
            fn bind_groups(&mut self, binder: &mut $crate::Binder<'_>) {
                $( binder.bind_group(&mut self.$field); )*
            }
        }
    };
}
