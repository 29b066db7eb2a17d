use anyhow::Result;

fn main() -> Result<()> {
    context_scout::cli::run()
}
