pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_users.sql")),
				"tables/002_user_traits.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_user_traits.sql")),
				"tables/003_feed_states.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_feed_states.sql")),
				"tables/004_matches.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_matches.sql")),
				"tables/005_message_threads.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_message_threads.sql")),
				"tables/006_messages.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_messages.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_are_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));

		for table in
			["users", "user_traits", "feed_states", "matches", "message_threads", "messages"]
		{
			assert!(
				sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
				"missing {table}"
			);
		}
	}
}
