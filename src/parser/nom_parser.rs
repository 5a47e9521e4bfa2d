use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, multispace0, none_of, one_of, space0},
    combinator::{opt, recognize, value},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// A node in the AST: a variant name or the name of another tree, with its
/// parameters and children.
#[derive(Debug, PartialEq, Eq)]
pub struct TreeDef<'src> {
    pub(crate) ty: &'src str,
    pub(crate) params: Vec<ParamDef<'src>>,
    pub(crate) children: Vec<TreeDef<'src>>,
}

impl<'src> TreeDef<'src> {
    pub fn ty(&self) -> &'src str {
        self.ty
    }

    pub fn params(&self) -> &[ParamDef<'src>] {
        &self.params
    }

    pub fn children(&self) -> &[TreeDef<'src>] {
        &self.children
    }

    #[allow(dead_code)]
    fn new(ty: &'src str) -> Self {
        Self {
            ty,
            params: vec![],
            children: vec![],
        }
    }

    fn new_with_child(ty: &'src str, child: TreeDef<'src>) -> Self {
        Self {
            ty,
            params: vec![],
            children: vec![child],
        }
    }

    #[allow(dead_code)]
    fn new_with_children(ty: &'src str, children: Vec<TreeDef<'src>>) -> Self {
        Self {
            ty,
            params: vec![],
            children,
        }
    }

    #[allow(dead_code)]
    fn new_with_params(ty: &'src str, params: Vec<ParamDef<'src>>) -> Self {
        Self {
            ty,
            params,
            children: vec![],
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParamDef<'src> {
    pub(crate) name: &'src str,
    /// Literals may contain escapes, so the decoded value is owned.
    pub(crate) value: String,
}

impl<'src> ParamDef<'src> {
    pub fn name(&self) -> &'src str {
        self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TreeRootDef<'src> {
    pub(crate) name: &'src str,
    pub(crate) root: TreeDef<'src>,
}

impl<'src> TreeRootDef<'src> {
    pub fn name(&self) -> &'src str {
        self.name
    }

    pub fn root(&self) -> &TreeDef<'src> {
        &self.root
    }
}

/// All the trees defined in a source file.
#[derive(Debug, PartialEq, Eq)]
pub struct TreeSource<'src> {
    pub tree_defs: Vec<TreeRootDef<'src>>,
}

impl<'src> TreeSource<'src> {
    pub fn find(&self, name: &str) -> Option<&TreeRootDef<'src>> {
        self.tree_defs.iter().find(|tree| tree.name == name)
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn newlines(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, many1(one_of("\r\n")), space0))(i)
}

fn open_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('('), multispace0))(i)
}

fn close_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(multispace0, char(')'), space0))(i)
}

fn open_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('{'), space0))(i)
}

fn close_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('}'), space0))(i)
}

fn line_comment<T>(i: &str) -> IResult<&str, Option<T>> {
    let (i, _) = tuple((space0, char('#'), opt(is_not("\n\r"))))(i)?;

    Ok((i, None))
}

fn some<I, R>(f: impl Fn(I) -> IResult<I, R>) -> impl Fn(I) -> IResult<I, Option<R>> {
    move |i| {
        let (i, res) = f(i)?;
        Ok((i, Some(res)))
    }
}

fn parse_tree(i: &str) -> IResult<&str, TreeRootDef> {
    let (i, _) = delimited(multispace0, tag("tree"), space0)(i)?;

    let (i, name) = delimited(space0, identifier, space0)(i)?;

    let (i, _) = delimited(space0, char('='), space0)(i)?;

    let (i, root) = parse_conditional_expr(i)?;

    Ok((i, TreeRootDef { name, root }))
}

fn tree_children(i: &str) -> IResult<&str, Vec<TreeDef>> {
    let (i, _) = many0(newlines)(i)?;

    let (i, v) = many0(delimited(
        space0,
        alt((line_comment, some(parse_conditional_expr))),
        many0(newlines),
    ))(i)?;

    let (i, _) = many0(newlines)(i)?;

    Ok((i, v.into_iter().flatten().collect()))
}

fn parse_tree_node(i: &str) -> IResult<&str, TreeDef> {
    let (i, ty) = delimited(space0, identifier, space0)(i)?;

    let (i, params) = opt(delimited(open_paren, param_defs, close_paren))(i)?;

    let (i, children) = opt(delimited(open_brace, tree_children, close_brace))(i)?;

    let (i, _) = opt(line_comment::<()>)(i)?;

    Ok((
        i,
        TreeDef {
            ty,
            params: params.unwrap_or_default(),
            children: children.unwrap_or_default(),
        },
    ))
}

/// `!Node` is shorthand for `Inverter { Node }`, and may be repeated.
fn parse_conditional_expr(i: &str) -> IResult<&str, TreeDef> {
    let (i, excl) = opt(delimited(space0, char('!'), space0))(i)?;

    if excl.is_some() {
        let (i, res) = parse_conditional_expr(i)?;

        Ok((i, TreeDef::new_with_child("Inverter", res)))
    } else {
        parse_tree_node(i)
    }
}

fn param_defs(i: &str) -> IResult<&str, Vec<ParamDef>> {
    many0(delimited(
        multispace0,
        param_def,
        many0(pair(multispace0, char(','))),
    ))(i)
}

fn param_def(i: &str) -> IResult<&str, ParamDef> {
    let (i, name) = delimited(space0, identifier, space0)(i)?;

    let (i, _) = delimited(space0, char('='), space0)(i)?;

    let (i, value) = delimited(space0, alt((str_literal, bare_literal)), space0)(i)?;

    Ok((i, ParamDef { name, value }))
}

/// Unquoted values such as `3`, `true` or `Failure`.
fn bare_literal(i: &str) -> IResult<&str, String> {
    let (i, val) = is_not(" \t\r\n,()\"")(i)?;
    Ok((i, val.to_owned()))
}

fn str_literal(input: &str) -> IResult<&str, String> {
    let (r, val) = delimited(
        preceded(multispace0, char('\"')),
        many0(none_of("\"")),
        terminated(char('"'), multispace0),
    )(input)?;
    Ok((r, unescape(&val)))
}

/// Decodes `\\` and `\n` in one pass; other escapes are kept as written.
fn unescape(chars: &[char]) -> String {
    let mut ret = String::with_capacity(chars.len());
    let mut iter = chars.iter();
    while let Some(&c) = iter.next() {
        if c != '\\' {
            ret.push(c);
            continue;
        }
        match iter.next() {
            Some('n') => ret.push('\n'),
            Some('\\') => ret.push('\\'),
            Some(&other) => {
                ret.push('\\');
                ret.push(other);
            }
            None => ret.push('\\'),
        }
    }
    ret
}

/// Parses a source file with any number of `tree name = ...` definitions.
///
/// The returned rest is empty when the whole input was consumed.
pub fn parse_file(i: &str) -> IResult<&str, TreeSource> {
    let (i, stmts) = many0(alt((
        delimited(multispace0, line_comment, multispace0),
        some(parse_tree),
    )))(i)?;

    // Eat up trailing newlines to indicate that the input was thoroughly consumed
    let (i, _) = multispace0(i)?;

    Ok((
        i,
        TreeSource {
            tree_defs: stmts.into_iter().flatten().collect(),
        },
    ))
}

#[cfg(test)]
mod test;
