fn main() -> anyhow::Result<()> {
    finger_counter::run_cli()?;
    Ok(())
}
