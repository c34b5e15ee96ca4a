use crate::cmd::TagsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_tags, tag_rows, OutputFormat};

pub fn run(_args: TagsArgs, format: OutputFormat) -> CliResult<i32> {
    print_tags(&tag_rows(), format);
    Ok(SUCCESS)
}
