pub mod utils {
    use kotoha_dynamics::syntax::{GlobalScope, Value};
    use kotoha_driver::Error;

    pub fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Compile and run against a fresh, empty global scope.
    pub fn run(source: &str) -> Value {
        try_run(source).unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_run(source: &str) -> Result<Value, Error> {
        init_logging();
        let mut globals = GlobalScope::new();
        kotoha_driver::run(source, "<test>", &mut globals)
    }

    /// Like `run`, but lets the caller preload the global scope with
    /// host functions first.
    pub fn run_with(
        source: &str,
        setup: impl FnOnce(&mut GlobalScope),
    ) -> Value {
        init_logging();
        let mut globals = GlobalScope::new();
        setup(&mut globals);
        kotoha_driver::run(source, "<test>", &mut globals)
            .unwrap_or_else(|err| panic!("{err}"))
    }
}
