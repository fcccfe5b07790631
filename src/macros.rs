/// Soft check against the current test unit.
///
/// Evaluates the condition, records a failure if it is false, and returns
/// the truth value. Never panics.
///
/// ```
/// use soft_assume::assume;
///
/// soft_assume::run(|_| {
///     let status = 200;
///     let body = "ok";
///     assume!(status == 200);
///     assume!(body.len() < 10, "body too long: {}", body.len());
///     assume!(body == "ok"; status, body);
///     assume!(status < 300, "status was {}", status; status);
/// });
/// ```
///
/// Names listed after `;` are captured with their `Debug` output when locals
/// capture is enabled.
#[macro_export]
macro_rules! assume {
    ($cond:expr $(,)?) => {
        $crate::__assume_check!($cond, ::core::option::Option::None, [])
    };
    ($cond:expr ; $($local:ident),+ $(,)?) => {
        $crate::__assume_check!($cond, ::core::option::Option::None, [$($local),+])
    };
    ($cond:expr, $fmt:literal $(, $arg:expr)* ; $($local:ident),+ $(,)?) => {
        $crate::__assume_check!(
            $cond,
            ::core::option::Option::Some(
                &::core::format_args!($fmt $(, $arg)*) as &dyn ::core::fmt::Display
            ),
            [$($local),+]
        )
    };
    ($cond:expr, $($arg:tt)+) => {
        $crate::__assume_check!(
            $cond,
            ::core::option::Option::Some(
                &::core::format_args!($($arg)+) as &dyn ::core::fmt::Display
            ),
            []
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __assume_check {
    ($cond:expr, $message:expr, [$($local:ident),*]) => {
        $crate::assume::check_current(
            $cond,
            $crate::Check {
                message: $message,
                expression: ::core::option::Option::Some(::core::stringify!($cond)),
                function: ::core::option::Option::Some($crate::__function_name!()),
                locals: &[$((::core::stringify!($local), &$local as &dyn ::core::fmt::Debug)),*],
            },
        )
    };
}

/// Path of the enclosing function, with closure segments removed.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        let mut name = __type_name_of(__here);
        name = name.strip_suffix("::__here").unwrap_or(name);
        while let ::core::option::Option::Some(outer) = name.strip_suffix("::{{closure}}") {
            name = outer;
        }
        name
    }};
}
